//! Schema-driven data synthesizer: fills absent required fields with plausible values.
//!
//! Pure: no I/O, and all randomness comes from the caller's RNG so tests can seed it.

use crate::config::{FieldDescriptor, FieldType, NumberRules, ResourceDescriptor, StringRules};
use chrono::{Duration, SecondsFormat, Utc};
use fake::faker::address::en::{BuildingNumber, CityName, CountryName, StreetName};
use fake::faker::internet::en::{Password, Username};
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use fake::Fake;
use rand::Rng;
use serde_json::{json, Map, Number, Value};

/// Domain used for every synthesized email address.
pub const EMAIL_DOMAIN: &str = "example.com";

/// Complete `partial` against `descriptor`: each required field that is absent gets its
/// `default`, or a generated value. Present fields and optional fields are left untouched.
pub fn synthesize<R: Rng>(partial: &Map<String, Value>, descriptor: &ResourceDescriptor, rng: &mut R) -> Map<String, Value> {
    let mut record = partial.clone();
    for field in &descriptor.fields {
        if !field.required || record.contains_key(&field.name) {
            continue;
        }
        let value = match &field.default {
            Some(default) => default.clone(),
            None => generate(field, rng),
        };
        record.insert(field.name.clone(), value);
    }
    record
}

/// A type-appropriate value for one field, ignoring its default.
pub fn generate<R: Rng>(field: &FieldDescriptor, rng: &mut R) -> Value {
    match &field.kind {
        FieldType::String(rules) => Value::String(generate_string(&field.name, rules, rng)),
        FieldType::Number(rules) => generate_number(&field.name, rules, rng),
        FieldType::Boolean => Value::Bool(rng.gen_bool(0.5)),
        FieldType::Date => {
            let at = Utc::now() + Duration::days(rng.gen_range(1..=365)) + Duration::seconds(rng.gen_range(0..86_400));
            Value::String(at.to_rfc3339_opts(SecondsFormat::Secs, true))
        }
        FieldType::Array => json!([]),
        FieldType::Object => json!({}),
        FieldType::Unknown(type_name) => Value::String(format!("<unknown:{}>", type_name)),
    }
}

fn generate_string<R: Rng>(name: &str, rules: &StringRules, rng: &mut R) -> String {
    if !rules.allowed.is_empty() {
        return rules.allowed[rng.gen_range(0..rules.allowed.len())].clone();
    }
    let min = rules.min_length.unwrap_or(0) as usize;
    let value: String = match name.to_lowercase().as_str() {
        "name" => Name().fake_with_rng(rng),
        "email" => {
            let user: String = Username().fake_with_rng(rng);
            let local: String = user
                .to_lowercase()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_')
                .collect();
            format!("{}{}@{}", local, rng.gen_range(1..1000), EMAIL_DOMAIN)
        }
        "address" => {
            let number: String = BuildingNumber().fake_with_rng(rng);
            let street: String = StreetName().fake_with_rng(rng);
            let city: String = CityName().fake_with_rng(rng);
            let country: String = CountryName().fake_with_rng(rng);
            format!("{} {}, {}, {}", number, street, city, country)
        }
        "password" => {
            let low = min.max(8);
            Password(low..low + 8).fake_with_rng(rng)
        }
        _ => {
            let words: Vec<String> = Words(2..4).fake_with_rng(rng);
            words.join(" ")
        }
    };
    fit_length(value, rules, rng)
}

/// Pad or cut a generated string so it satisfies `minLength`/`maxLength`.
fn fit_length<R: Rng>(mut value: String, rules: &StringRules, rng: &mut R) -> String {
    let min = rules.min_length.unwrap_or(0) as usize;
    while value.chars().count() < min {
        value.push(rng.gen_range(b'a'..=b'z') as char);
    }
    if let Some(max) = rules.max_length {
        value = value.chars().take(max as usize).collect();
    }
    value
}

fn generate_number<R: Rng>(name: &str, rules: &NumberRules, rng: &mut R) -> Value {
    let n: i64 = if name.eq_ignore_ascii_case("age") {
        rng.gen_range(18..=100)
    } else {
        rng.gen_range(1..=100)
    };
    let mut n = n as f64;
    if let Some(min) = rules.min {
        n = n.max(min);
    }
    if let Some(max) = rules.max {
        n = n.min(max);
    }
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number((n as i64).into())
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn all_types() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "Sample",
            vec![
                FieldDescriptor::new("title", FieldType::string()).required(),
                FieldDescriptor::new("count", FieldType::number()).required(),
                FieldDescriptor::new("flag", FieldType::Boolean).required(),
                FieldDescriptor::new("due", FieldType::Date).required(),
                FieldDescriptor::new("tags", FieldType::Array).required(),
                FieldDescriptor::new("meta", FieldType::Object).required(),
                FieldDescriptor::new("note", FieldType::string()),
            ],
        )
    }

    #[test]
    fn fills_every_required_field_with_the_right_shape() {
        let descriptor = all_types();
        let record = synthesize(&Map::new(), &descriptor, &mut rng());
        for field in &descriptor.fields {
            if field.required {
                let v = record.get(&field.name).unwrap_or_else(|| panic!("missing {}", field.name));
                assert!(field.kind.accepts(v), "{} = {}", field.name, v);
            }
        }
        assert!(!record.contains_key("note"));
    }

    #[test]
    fn builtin_resources_synthesize_totally() {
        let mut rng = rng();
        for descriptor in Registry::builtin().resources() {
            let record = synthesize(&Map::new(), descriptor, &mut rng);
            for field in descriptor.fields.iter().filter(|f| f.required) {
                assert!(field.kind.accepts(&record[&field.name]), "{}.{}", descriptor.name, field.name);
            }
        }
    }

    #[test]
    fn present_fields_are_untouched() {
        let descriptor = all_types();
        let mut partial = Map::new();
        partial.insert("title".into(), json!("kept"));
        partial.insert("count".into(), json!("not a number"));
        let record = synthesize(&partial, &descriptor, &mut rng());
        assert_eq!(record["title"], "kept");
        assert_eq!(record["count"], "not a number");
    }

    #[test]
    fn defaults_win_over_generators() {
        let descriptor = ResourceDescriptor::new(
            "User",
            vec![FieldDescriptor::new("role", FieldType::string()).required().default_value(json!("user"))],
        );
        let record = synthesize(&Map::new(), &descriptor, &mut rng());
        assert_eq!(record["role"], "user");
    }

    #[test]
    fn name_keyed_generators() {
        let users = Registry::builtin().by_path("users").unwrap().clone();
        let record = synthesize(&Map::new(), &users, &mut rng());
        let email = record["email"].as_str().unwrap();
        assert!(email.ends_with("@example.com"), "{}", email);
        let age = record["age"].as_i64().unwrap();
        assert!((18..=100).contains(&age));
        assert!(record["password"].as_str().unwrap().len() >= 8);
        assert!(record["address"].as_str().unwrap().matches(", ").count() >= 2);
    }

    #[test]
    fn numbers_respect_bounds_and_enums_pick_allowed() {
        let field = FieldDescriptor::new("score", FieldType::Number(NumberRules { min: Some(500.0), max: None }));
        assert_eq!(generate(&field, &mut rng()), json!(500));

        let field = FieldDescriptor::new(
            "role",
            FieldType::String(StringRules {
                allowed: vec!["admin".into(), "moderator".into()],
                ..StringRules::default()
            }),
        );
        let v = generate(&field, &mut rng());
        assert!(v == "admin" || v == "moderator");
    }

    #[test]
    fn future_dates_and_unknown_placeholders() {
        let due = generate(&FieldDescriptor::new("due", FieldType::Date), &mut rng());
        let at = chrono::DateTime::parse_from_rfc3339(due.as_str().unwrap()).unwrap();
        assert!(at.with_timezone(&Utc) > Utc::now());

        let v = generate(&FieldDescriptor::new("ref", FieldType::Unknown("ObjectId".into())), &mut rng());
        assert_eq!(v, "<unknown:ObjectId>");
    }

    #[test]
    fn same_seed_same_record() {
        let descriptor = all_types();
        let a = synthesize(&Map::new(), &descriptor, &mut StdRng::seed_from_u64(1));
        let b = synthesize(&Map::new(), &descriptor, &mut StdRng::seed_from_u64(1));
        assert_eq!(a["title"], b["title"]);
        assert_eq!(a["count"], b["count"]);
    }
}
