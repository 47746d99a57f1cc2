//! Catalog Command

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use regcheck_common::{Category, Priority, TestCase};
use regcheck_e2e::CaseFilter;

use crate::commands::run::load_catalog;
use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Args, Debug, Default)]
pub struct CatalogArgs {
    /// Only list cases of this category
    #[arg(long)]
    pub category: Option<Category>,

    /// Only list cases of this priority
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Only list cases whose id starts with this prefix
    #[arg(long)]
    pub id: Option<String>,

    /// YAML catalog file or directory instead of the built-in suite
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Include payloads in the output
    #[arg(long)]
    pub payloads: bool,
}

/// Catalog entry display wrapper for serialization
#[derive(Serialize)]
pub struct CaseDisplay {
    pub id: String,
    pub category: Category,
    pub priority: Priority,
    pub expected: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<regcheck_common::Payload>,
}

impl CaseDisplay {
    fn new(case: &TestCase, with_payload: bool) -> Self {
        Self {
            id: case.id.clone(),
            category: case.category,
            priority: case.priority,
            expected: case.expected.to_string(),
            description: case.description.clone(),
            payload: with_payload.then(|| case.payload.clone()),
        }
    }
}

impl TableDisplay for CaseDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Category", "Priority", "Expected", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.category.to_string(),
            self.priority.to_string(),
            self.expected.clone(),
            self.description.clone(),
        ]
    }
}

pub fn execute(args: CatalogArgs, format: OutputFormat) -> Result<()> {
    let catalog = load_catalog(args.catalog.as_deref())?;
    let filter = CaseFilter {
        category: args.category,
        priority: args.priority,
        id_prefix: args.id.clone(),
    };

    let cases: Vec<CaseDisplay> = catalog
        .list_cases(&filter)
        .into_iter()
        .map(|case| CaseDisplay::new(case, args.payloads))
        .collect();

    print_list(&cases, format)?;
    if !format.is_structured() {
        println!("{} case(s)", cases.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regcheck_e2e::Catalog;

    #[test]
    fn test_row_matches_headers() {
        let catalog = Catalog::registration(0).unwrap();
        let case = catalog.get("REG_001").unwrap();
        let display = CaseDisplay::new(case, false);
        assert_eq!(display.row().len(), CaseDisplay::headers().len());
        assert_eq!(display.row()[1], "Positive");
        assert!(display.payload.is_none());
    }
}
