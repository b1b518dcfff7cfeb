//! OpenAPI document built from the registry at startup, served as JSON.

use crate::config::{FieldDescriptor, FieldType, ResourceDescriptor};
use crate::registry::Registry;
use axum::{routing::get, Json, Router};
use std::sync::Arc;
use utoipa::openapi::{
    content::ContentBuilder,
    path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder, PathsBuilder},
    request_body::RequestBodyBuilder,
    schema::{ArrayBuilder, KnownFormat, ObjectBuilder, SchemaFormat, Type},
    ComponentsBuilder, InfoBuilder, OpenApi, OpenApiBuilder, Ref, Required, ResponseBuilder,
};

const JSON: &str = "application/json";

pub fn docs_routes(registry: &Registry) -> Router {
    let doc = Arc::new(openapi(registry));
    Router::new().route(
        "/api-docs/openapi.json",
        get(move || {
            let doc = Arc::clone(&doc);
            async move { Json(doc.as_ref().clone()) }
        }),
    )
}

/// One path pair per resource (`/api/<path>` and `/api/<path>/{id}`) plus a record schema per resource.
pub fn openapi(registry: &Registry) -> OpenApi {
    let mut paths = PathsBuilder::new();
    let mut components = ComponentsBuilder::new()
        .schema("Error", error_schema())
        .schema("Deleted", deleted_schema());

    for resource in registry.resources() {
        let name = resource.name.as_str();
        let page_name = format!("{}Page", name);
        components = components
            .schema(name, record_schema(resource))
            .schema(page_name.as_str(), page_schema(name));

        let base = format!("/api/{}", resource.path());
        let collection = PathItemBuilder::new()
            .operation(
                HttpMethod::Get,
                operation(resource, "list", format!("List {} records", name))
                    .parameters(Some(list_parameters(resource)))
                    .response("200", json_response("Paginated records", &page_name))
                    .response("400", json_response("Invalid pagination", "Error"))
                    .build(),
            )
            .operation(
                HttpMethod::Post,
                operation(resource, "create", format!("Create a {}", name))
                    .request_body(Some(body(name)))
                    .response("201", json_response("Created record", name))
                    .response("400", json_response("Validation failed", "Error"))
                    .build(),
            )
            .build();
        let item = PathItemBuilder::new()
            .operation(
                HttpMethod::Get,
                operation(resource, "get", format!("Fetch a {} by id", name))
                    .parameter(id_parameter())
                    .response("200", json_response("Record", name))
                    .response("404", json_response("Not found", "Error"))
                    .build(),
            )
            .operation(
                HttpMethod::Put,
                operation(resource, "update", format!("Update a {}", name))
                    .parameter(id_parameter())
                    .request_body(Some(body(name)))
                    .response("200", json_response("Updated record", name))
                    .response("400", json_response("Validation failed", "Error"))
                    .response("404", json_response("Not found", "Error"))
                    .build(),
            )
            .operation(
                HttpMethod::Delete,
                operation(resource, "delete", format!("Delete a {}", name))
                    .parameter(id_parameter())
                    .response("200", json_response("Deleted record", "Deleted"))
                    .response("404", json_response("Not found", "Error"))
                    .build(),
            )
            .build();
        paths = paths.path(base.clone(), collection).path(format!("{}/{{id}}", base), item);
    }

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .build(),
        )
        .paths(paths.build())
        .components(Some(components.build()))
        .build()
}

fn operation(resource: &ResourceDescriptor, verb: &str, summary: String) -> OperationBuilder {
    OperationBuilder::new()
        .tag(resource.path())
        .operation_id(Some(format!("{}_{}", verb, resource.path())))
        .summary(Some(summary))
}

fn json_response(description: &str, schema: &str) -> utoipa::openapi::Response {
    ResponseBuilder::new()
        .description(description)
        .content(JSON, ContentBuilder::new().schema(Some(Ref::from_schema_name(schema))).build())
        .build()
}

fn body(schema: &str) -> utoipa::openapi::request_body::RequestBody {
    RequestBodyBuilder::new()
        .content(JSON, ContentBuilder::new().schema(Some(Ref::from_schema_name(schema))).build())
        .required(Some(Required::True))
        .build()
}

fn id_parameter() -> utoipa::openapi::path::Parameter {
    ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .schema(Some(
            ObjectBuilder::new()
                .schema_type(Type::String)
                .format(Some(SchemaFormat::KnownFormat(KnownFormat::Uuid))),
        ))
        .build()
}

fn list_parameters(resource: &ResourceDescriptor) -> Vec<utoipa::openapi::path::Parameter> {
    let paging = ["page", "limit"].into_iter().map(|name| {
        ParameterBuilder::new()
            .name(name)
            .parameter_in(ParameterIn::Query)
            .required(Required::False)
            .schema(Some(ObjectBuilder::new().schema_type(Type::Integer).minimum(Some(1))))
            .build()
    });
    let filters = resource
        .fields
        .iter()
        .filter(|f| matches!(f.kind, FieldType::String(_) | FieldType::Number(_) | FieldType::Boolean))
        .map(|f| {
            ParameterBuilder::new()
                .name(f.name.as_str())
                .parameter_in(ParameterIn::Query)
                .required(Required::False)
                .description(Some(format!("Exact match on {}", f.name)))
                .schema(Some(field_schema(f)))
                .build()
        });
    paging.chain(filters).collect()
}

fn field_schema(field: &FieldDescriptor) -> ObjectBuilder {
    let builder = match &field.kind {
        FieldType::String(rules) => {
            let mut b = ObjectBuilder::new()
                .schema_type(Type::String)
                .min_length(rules.min_length.map(|n| n as usize))
                .max_length(rules.max_length.map(|n| n as usize))
                .pattern(rules.pattern.clone());
            if !rules.allowed.is_empty() {
                b = b.enum_values(Some(rules.allowed.clone()));
            }
            b
        }
        FieldType::Number(rules) => ObjectBuilder::new()
            .schema_type(Type::Number)
            .minimum(rules.min)
            .maximum(rules.max),
        FieldType::Boolean => ObjectBuilder::new().schema_type(Type::Boolean),
        FieldType::Date => ObjectBuilder::new()
            .schema_type(Type::String)
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::DateTime))),
        FieldType::Array => ObjectBuilder::new().schema_type(Type::Array),
        FieldType::Object | FieldType::Unknown(_) => ObjectBuilder::new().schema_type(Type::Object),
    };
    builder.default(field.default.clone())
}

fn record_schema(resource: &ResourceDescriptor) -> ObjectBuilder {
    let timestamp = || {
        ObjectBuilder::new()
            .schema_type(Type::String)
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::DateTime)))
    };
    let mut schema = ObjectBuilder::new().schema_type(Type::Object).property(
        "id",
        ObjectBuilder::new()
            .schema_type(Type::String)
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::Uuid))),
    );
    for field in &resource.fields {
        schema = schema.property(field.name.as_str(), field_schema(field));
        if field.required {
            schema = schema.required(field.name.as_str());
        }
    }
    schema
        .property("createdAt", timestamp())
        .property("updatedAt", timestamp())
}

fn page_schema(name: &str) -> ObjectBuilder {
    let count = || ObjectBuilder::new().schema_type(Type::Integer);
    ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("totalDocuments", count())
        .property("totalPages", count())
        .property("currentPage", count())
        .property("documents", ArrayBuilder::new().items(Ref::from_schema_name(name)))
}

fn error_schema() -> ObjectBuilder {
    ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("message", ObjectBuilder::new().schema_type(Type::String))
        .property("code", ObjectBuilder::new().schema_type(Type::String))
}

fn deleted_schema() -> ObjectBuilder {
    ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("message", ObjectBuilder::new().schema_type(Type::String))
        .property("record", ObjectBuilder::new().schema_type(Type::Object))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_resource_gets_collection_and_item_paths() {
        let doc = openapi(&Registry::builtin());
        let json = serde_json::to_value(&doc).unwrap();
        let paths = json["paths"].as_object().unwrap();
        assert_eq!(paths.len(), Registry::builtin().len() * 2);
        assert!(paths["/api/users"]["get"].is_object());
        assert!(paths["/api/users"]["post"].is_object());
        assert!(paths["/api/users/{id}"]["delete"].is_object());
        assert!(paths.contains_key("/api/subcategories/{id}"));
    }

    #[test]
    fn record_schema_reflects_constraints() {
        let doc = serde_json::to_value(openapi(&Registry::builtin())).unwrap();
        let user = &doc["components"]["schemas"]["User"];
        assert_eq!(user["properties"]["age"]["maximum"].as_f64(), Some(120.0));
        assert_eq!(user["properties"]["role"]["default"], "user");
        assert!(user["required"].as_array().unwrap().contains(&serde_json::json!("email")));
    }
}
