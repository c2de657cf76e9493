//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use adoq_domain::{CompiledQuery, FieldDef, IntentDecision};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Active format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format the field registry.
    pub fn format_fields(&self, fields: &[&FieldDef]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<serde_json::Value> = fields
                    .iter()
                    .map(|f| {
                        serde_json::json!({
                            "reference": f.reference,
                            "value_type": f.value_type.as_str(),
                            "operators": operator_tokens(f),
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Table => {
                if fields.is_empty() {
                    return Ok("No fields found.".to_string());
                }

                let mut builder = Builder::default();
                builder.push_record(["Reference", "Type", "Operators"]);
                for field in fields {
                    builder.push_record([
                        field.reference.clone(),
                        field.value_type.as_str().to_string(),
                        operator_tokens(field).join(" "),
                    ]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format a compiled query.
    pub fn format_query(&self, query: &CompiledQuery) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&query_json(query))?),
            OutputFormat::Table => {
                let include = query.include();
                let mut extras = Vec::new();
                if include.comments {
                    extras.push("comments");
                }
                if include.history {
                    extras.push("history");
                }

                let mut out = format!("{}\n\n-- {}", query.text(), query.top_parameter());
                if !extras.is_empty() {
                    out.push_str(&format!(", include {}", extras.join(" + ")));
                }
                Ok(out)
            }
        }
    }

    /// Format a classification, with the query it compiles to when it has one.
    pub fn format_decision(
        &self,
        decision: &IntentDecision,
        query: Option<&CompiledQuery>,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "intent_type": decision.kind(),
                    "confidence": decision.confidence(),
                    "filter": decision.filter(),
                    "analysis": decision.analysis(),
                    "reasoning": decision.reasoning(),
                    "query": query.map(query_json),
                });
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Intent".to_string(), decision.kind().to_string()]);
                builder.push_record(["Confidence".to_string(), format!("{:.2}", decision.confidence())]);

                if let Some(filter) = decision.filter() {
                    builder.push_record(["Filter".to_string(), serde_json::to_string(filter)?]);
                }
                if let Some(analysis) = decision.analysis() {
                    builder.push_record(["Analysis".to_string(), analysis.analysis_type.to_string()]);
                    if let Some(format) = &analysis.format_requirements {
                        builder.push_record(["Format".to_string(), format.clone()]);
                    }
                }
                if !decision.reasoning().is_empty() {
                    builder.push_record(["Reasoning".to_string(), decision.reasoning().to_string()]);
                }
                if let Some(query) = query {
                    builder.push_record(["Query".to_string(), query.text().to_string()]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        format!("✓ {}", message)
    }

    fn render(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }
}

fn operator_tokens(field: &FieldDef) -> Vec<&'static str> {
    field.value_type.operators().iter().map(|op| op.token()).collect()
}

fn query_json(query: &CompiledQuery) -> serde_json::Value {
    serde_json::json!({
        "query": query.text(),
        "top": query.result_cap(),
        "include": query.include(),
    })
}
