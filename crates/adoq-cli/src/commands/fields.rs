//! Fields command implementation.

use crate::cli::FieldsArgs;
use crate::error::Result;
use crate::output::Formatter;
use adoq_domain::{FieldDef, FieldRegistry};

/// Execute the fields command.
pub fn execute_fields(args: FieldsArgs, registry: &FieldRegistry, formatter: &Formatter) -> Result<()> {
    let fields = matching_fields(registry, args.search.as_deref());
    println!("{}", formatter.format_fields(&fields)?);
    Ok(())
}

fn matching_fields<'a>(registry: &'a FieldRegistry, search: Option<&str>) -> Vec<&'a FieldDef> {
    let needle = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    registry
        .fields()
        .into_iter()
        .filter(|f| f.reference.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_is_case_insensitive() {
        let registry = FieldRegistry::standard();

        let paths = matching_fields(&registry, Some("PATH"));
        assert!(paths.iter().any(|f| f.reference == "System.AreaPath"));
        assert!(paths.iter().any(|f| f.reference == "System.IterationPath"));
        assert!(paths.iter().all(|f| f.reference.to_lowercase().contains("path")));

        assert_eq!(matching_fields(&registry, None).len(), registry.fields().len());
        assert!(matching_fields(&registry, Some("nonexistent")).is_empty());
    }
}
