//! The interactive loop: resource, then operation, then record and input, then request and render.

use crate::client::ApiClient;
use crate::error::CliError;
use crate::input::{display, parse_field, record_label};
use crate::prompt::Prompter;
use crudify::{synthesize, FieldDescriptor, ResourceDescriptor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{Map, Value};
use std::io::Write;

const GO_BACK: &str = "Go back";
const EXIT: &str = "Exit";
/// Records offered when picking one for get/update/delete. The server clamps larger values.
const PICK_LIMIT: &str = "50";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::Get,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Operation::List => "List",
            Operation::Get => "Get by id",
            Operation::Create => "Create",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
        }
    }
}

pub struct Session<P, W> {
    client: ApiClient,
    resources: Vec<ResourceDescriptor>,
    prompter: P,
    out: W,
    rng: StdRng,
}

impl<P: Prompter, W: Write> Session<P, W> {
    pub fn new(client: ApiClient, resources: Vec<ResourceDescriptor>, prompter: P, out: W) -> Self {
        Session {
            client,
            resources,
            prompter,
            out,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixed RNG for generated records.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs until the operator picks Exit or interrupts a prompt. Request failures are
    /// printed and the loop continues.
    pub async fn run(&mut self) -> Result<(), CliError> {
        loop {
            match self.step().await {
                Ok(true) => {}
                Ok(false) | Err(CliError::Interrupted) => return Ok(()),
                Err(e) if e.is_recoverable() => writeln!(self.out, "error: {}", e)?,
                Err(e) => return Err(e),
            }
        }
    }

    /// One pass through the menus. `false` once the operator exits.
    async fn step(&mut self) -> Result<bool, CliError> {
        let mut choices: Vec<String> = self.resources.iter().map(|r| r.name.clone()).collect();
        choices.push(EXIT.to_string());
        let picked = self.prompter.select("Resource", &choices)?;
        let Some(resource) = self.resources.get(picked).cloned() else {
            return Ok(false);
        };

        let mut choices: Vec<String> = Operation::ALL.iter().map(|op| op.label().to_string()).collect();
        choices.push(GO_BACK.to_string());
        let picked = self.prompter.select(&format!("{} operation", resource.name), &choices)?;
        let Some(&operation) = Operation::ALL.get(picked) else {
            return Ok(true);
        };

        match operation {
            Operation::List => self.list(&resource).await?,
            Operation::Get => self.get(&resource).await?,
            Operation::Create => self.create(&resource).await?,
            Operation::Update => self.update(&resource).await?,
            Operation::Delete => self.delete(&resource).await?,
        }
        Ok(true)
    }

    async fn list(&mut self, resource: &ResourceDescriptor) -> Result<(), CliError> {
        let mut query = vec![
            ("page".to_string(), self.prompter.input("page", "1")?),
            ("limit".to_string(), self.prompter.input("limit", "10")?),
        ];
        let filters = self.prompter.input("filters (field=value&..., blank for none)", "")?;
        query.extend(
            filters
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string())),
        );
        let page = self.client.list(&resource.path(), &query).await?;
        writeln!(
            self.out,
            "page {} of {} ({} {} in total)",
            page.current_page,
            page.total_pages,
            page.total_documents,
            resource.path()
        )?;
        self.render(&Value::Array(page.documents))
    }

    async fn get(&mut self, resource: &ResourceDescriptor) -> Result<(), CliError> {
        let Some(id) = self.pick_record(resource).await? else {
            return Ok(());
        };
        let record = self.client.get(&resource.path(), &id).await?;
        self.render(&record)
    }

    async fn create(&mut self, resource: &ResourceDescriptor) -> Result<(), CliError> {
        let auto = self
            .prompter
            .confirm(&format!("Auto-generate {} data?", resource.name), true)?;
        let body = if auto {
            let generated = synthesize(&Map::new(), resource, &mut self.rng);
            writeln!(self.out, "generated:")?;
            self.render(&Value::Object(generated.clone()))?;
            generated
        } else {
            let mut body = Map::new();
            for field in &resource.fields {
                let initial = field.default.as_ref().map(display).unwrap_or_default();
                if let Some(value) = self.ask_field(field, &initial)? {
                    body.insert(field.name.clone(), value);
                }
            }
            body
        };
        let created = self.client.create(&resource.path(), &Value::Object(body)).await?;
        writeln!(self.out, "{} created", resource.name)?;
        self.render(&created)
    }

    /// Prompts every field pre-filled with the current value; only edited fields are sent.
    async fn update(&mut self, resource: &ResourceDescriptor) -> Result<(), CliError> {
        let Some(id) = self.pick_record(resource).await? else {
            return Ok(());
        };
        let current = self.client.get(&resource.path(), &id).await?;
        let mut changes = Map::new();
        for field in &resource.fields {
            let initial = current.get(&field.name).map(display).unwrap_or_default();
            if let Some(value) = self.ask_field(field, &initial)? {
                if current.get(&field.name) != Some(&value) {
                    changes.insert(field.name.clone(), value);
                }
            }
        }
        if changes.is_empty() {
            writeln!(self.out, "nothing changed")?;
            return Ok(());
        }
        let updated = self.client.update(&resource.path(), &id, &Value::Object(changes)).await?;
        writeln!(self.out, "{} updated", resource.name)?;
        self.render(&updated)
    }

    async fn delete(&mut self, resource: &ResourceDescriptor) -> Result<(), CliError> {
        let Some(id) = self.pick_record(resource).await? else {
            return Ok(());
        };
        if !self.prompter.confirm(&format!("Delete {} {}?", resource.name, id), false)? {
            return Ok(());
        }
        let deleted = self.client.delete(&resource.path(), &id).await?;
        writeln!(self.out, "{}", deleted.message)?;
        self.render(&deleted.record)
    }

    /// Id of a record chosen from a freshly fetched list, or `None` for Go back / empty collection.
    async fn pick_record(&mut self, resource: &ResourceDescriptor) -> Result<Option<String>, CliError> {
        let page = self
            .client
            .list(&resource.path(), &[("limit".to_string(), PICK_LIMIT.to_string())])
            .await?;
        if page.documents.is_empty() {
            writeln!(self.out, "no {} found", resource.path())?;
            return Ok(None);
        }
        let mut choices: Vec<String> = page.documents.iter().map(record_label).collect();
        choices.push(GO_BACK.to_string());
        let picked = self.prompter.select(&format!("Select a {}", resource.name), &choices)?;
        Ok(page
            .documents
            .get(picked)
            .and_then(|d| d.get("id"))
            .and_then(Value::as_str)
            .map(String::from))
    }

    /// Blank answers skip the field. Re-prompts until the text parses as the field's type.
    fn ask_field(&mut self, field: &FieldDescriptor, initial: &str) -> Result<Option<Value>, CliError> {
        let message = format!(
            "{} ({}{})",
            field.name,
            field.kind.type_name(),
            if field.required { ", required" } else { "" }
        );
        loop {
            let answer = self.prompter.input(&message, initial)?;
            if answer.trim().is_empty() {
                return Ok(None);
            }
            match parse_field(field, &answer) {
                Ok(value) => return Ok(Some(value)),
                Err(msg) => writeln!(self.out, "{}", msg)?,
            }
        }
    }

    fn render(&mut self, value: &Value) -> Result<(), CliError> {
        writeln!(self.out, "{}", serde_json::to_string_pretty(value)?)?;
        Ok(())
    }
}
