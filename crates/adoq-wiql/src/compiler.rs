//! FilterSpec to WIQL compilation

use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::escape::{quote_field, quote_literal};
use crate::fragment;
use crate::macros::{parse_date_macro, resolve_period, DateExpr};
use adoq_domain::{
    refs, AuxiliaryData, CompiledQuery, DateRange, DateWindow, FieldDef, FieldRegistry,
    FilterSpec, Literal, Operator, Predicate, PredicateValue, RelativePeriod, SortSpec, ValueType,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Columns every compiled query selects
pub const CORE_COLUMNS: [&str; 7] = [
    refs::ID,
    refs::TITLE,
    refs::STATE,
    refs::WORK_ITEM_TYPE,
    refs::ASSIGNED_TO,
    refs::CHANGED_DATE,
    refs::PRIORITY,
];

const DEFAULT_ORDER: &str = "[System.ChangedDate] DESC";

/// Ambient facts a compilation depends on that the filter does not carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileContext {
    /// Team project to scope to; `None` uses the `@Project` macro
    pub project: Option<String>,

    /// Date that quarter boundaries are computed from
    pub today: NaiveDate,
}

impl CompileContext {
    /// Context for a project, dated today
    pub fn new(project: Option<String>) -> Self {
        Self {
            project: project.filter(|p| !p.trim().is_empty()),
            today: Utc::now().date_naive(),
        }
    }

    /// Pin the date (tests, reproducible output)
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// The predicate that scopes a query to the current project
    pub fn scope_predicate(&self) -> String {
        match &self.project {
            Some(project) => format!("[{}] = {}", refs::TEAM_PROJECT, quote_literal(project)),
            None => format!("[{}] = @Project", refs::TEAM_PROJECT),
        }
    }
}

impl Default for CompileContext {
    fn default() -> Self {
        Self::new(None)
    }
}

/// The two accepted input shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryInput {
    /// Structured filter
    Filter(FilterSpec),

    /// Pre-formed WHERE clause (the `WHERE` keyword is optional)
    Fragment(String),
}

/// Deterministic, side-effect-free WIQL compiler
#[derive(Debug, Clone)]
pub struct Compiler {
    registry: Arc<FieldRegistry>,
    config: CompilerConfig,
}

impl Compiler {
    /// Create a compiler over a registry
    pub fn new(registry: Arc<FieldRegistry>, config: CompilerConfig) -> Self {
        Self { registry, config }
    }

    /// Compiler over the standard registry with default settings
    pub fn standard() -> Self {
        Self::new(Arc::new(FieldRegistry::standard()), CompilerConfig::default())
    }

    /// The registry fields are resolved through
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile either input shape
    pub fn compile_input(
        &self,
        input: &QueryInput,
        ctx: &CompileContext,
    ) -> Result<CompiledQuery, CompileError> {
        match input {
            QueryInput::Filter(spec) => self.compile(spec, ctx),
            QueryInput::Fragment(clause) => self.compile_fragment(clause, ctx),
        }
    }

    /// Validate a filter without producing a query
    pub fn check(&self, spec: &FilterSpec) -> Result<(), CompileError> {
        self.compile(spec, &CompileContext::default()).map(|_| ())
    }

    /// Compile a structured filter
    ///
    /// # Examples
    ///
    /// ```
    /// use adoq_domain::FilterSpec;
    /// use adoq_wiql::{CompileContext, Compiler};
    ///
    /// let compiler = Compiler::standard();
    /// let spec = FilterSpec::builder().work_item_types(["Bug"]).build();
    /// let query = compiler.compile(&spec, &CompileContext::default()).unwrap();
    ///
    /// assert!(query.text().contains("[System.WorkItemType] = 'Bug'"));
    /// assert!(query.text().contains("[System.TeamProject] = @Project"));
    /// assert_eq!(query.result_cap(), 150);
    /// ```
    pub fn compile(
        &self,
        spec: &FilterSpec,
        ctx: &CompileContext,
    ) -> Result<CompiledQuery, CompileError> {
        if spec.is_empty() {
            return Err(CompileError::EmptyFilter);
        }

        let mut clauses = Vec::new();
        let mut scoped = false;

        if !spec.ids.is_empty() {
            clauses.push(self.ids_clause(&spec.ids)?);
        }

        for predicate in &spec.predicates {
            let (clause, is_scope) = self.predicate_clause(predicate, ctx)?;
            scoped |= is_scope;
            clauses.push(clause);
        }

        if let Some(window) = &spec.date_window {
            clauses.extend(self.date_window_clauses(window, ctx)?);
        }

        if !spec.free_text_terms.is_empty() {
            clauses.push(free_text_clause(&spec.free_text_terms)?);
        }

        if !scoped {
            clauses.insert(0, ctx.scope_predicate());
        }

        let cap = match spec.max_items {
            Some(0) => return Err(CompileError::invalid("max_items", "must be at least 1")),
            requested => self.config.effective_cap(requested),
        };

        let order = match &spec.sort {
            Some(sort) => self.order_clause(sort)?,
            None => DEFAULT_ORDER.to_string(),
        };

        let query = assemble(&clauses, &order, cap, spec.include);
        debug!(
            predicates = spec.predicates.len(),
            ids = spec.ids.len(),
            cap,
            "Compiled filter"
        );
        Ok(query)
    }

    /// Complete a WHERE-only fragment into a full query
    ///
    /// The fragment is parsed and its values checked; the scope predicate
    /// is added unless the fragment pins the team project at its top level.
    pub fn compile_fragment(
        &self,
        clause: &str,
        ctx: &CompileContext,
    ) -> Result<CompiledQuery, CompileError> {
        let fragment = fragment::normalize(clause, &self.registry, ctx)?;

        let mut clauses = Vec::with_capacity(2);
        if !fragment.scoped {
            clauses.push(ctx.scope_predicate());
        }
        clauses.push(format!("({})", fragment.text));

        debug!(scoped = fragment.scoped, "Compiled WHERE fragment");
        Ok(assemble(
            &clauses,
            DEFAULT_ORDER,
            self.config.effective_cap(None),
            AuxiliaryData::default(),
        ))
    }

    fn resolve(&self, name: &str) -> Result<&FieldDef, CompileError> {
        Ok(self.registry.resolve(name)?)
    }

    fn ids_clause(&self, ids: &[u64]) -> Result<String, CompileError> {
        if ids.contains(&0) {
            return Err(CompileError::invalid(refs::ID, "work item IDs start at 1"));
        }
        let mut seen = Vec::with_capacity(ids.len());
        for id in ids {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        let list = seen
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("[{}] IN ({})", refs::ID, list))
    }

    /// Render one predicate; the flag is set when it pins the team project
    ///
    /// Only `=` and `IN` pin it. A negative or substring constraint still
    /// ranges over every project, so the context scope must be added.
    fn predicate_clause(
        &self,
        predicate: &Predicate,
        ctx: &CompileContext,
    ) -> Result<(String, bool), CompileError> {
        let def = self.resolve(&predicate.field)?;
        let op = predicate.operator;
        let field = def.reference.as_str();

        if !def.value_type.accepts(op) {
            return Err(CompileError::OperatorTypeMismatch {
                field: field.to_string(),
                operator: op,
                value_type: def.value_type,
            });
        }

        let values: Vec<&Literal> = match (&predicate.value, op.takes_list()) {
            (PredicateValue::List(items), true) if items.is_empty() => {
                return Err(CompileError::invalid(field, format!("{} needs at least one value", op)));
            }
            (PredicateValue::List(items), true) => items.iter().collect(),
            (PredicateValue::List(items), false) => match items.as_slice() {
                [only] => vec![only],
                _ => {
                    return Err(CompileError::invalid(
                        field,
                        format!("{} takes a single value, got {}", op, items.len()),
                    ))
                }
            },
            (PredicateValue::Single(value), _) => vec![value],
        };

        if is_search_operator(op) {
            if let Some(Literal::Text(t)) = values.first() {
                if t.trim().is_empty() {
                    return Err(CompileError::invalid(field, format!("{} needs a non-blank value", op)));
                }
            }
        }

        let rendered = values
            .into_iter()
            .map(|v| render_value(def, v, ctx))
            .collect::<Result<Vec<_>, _>>()?;

        let quoted = quote_field(field).map_err(|e| CompileError::invalid(field, e))?;
        let clause = if op.takes_list() {
            format!("{} {} ({})", quoted, op, rendered.join(", "))
        } else {
            format!("{} {} {}", quoted, op, rendered.join(""))
        };

        let is_scope = field.eq_ignore_ascii_case(refs::TEAM_PROJECT) && pins_value(op);
        Ok((clause, is_scope))
    }

    fn date_window_clauses(
        &self,
        window: &DateWindow,
        ctx: &CompileContext,
    ) -> Result<Vec<String>, CompileError> {
        let def = self.resolve(&window.field)?;
        let field = def.reference.as_str();
        if def.value_type != ValueType::DateTime {
            return Err(CompileError::OperatorTypeMismatch {
                field: field.to_string(),
                operator: Operator::Ge,
                value_type: def.value_type,
            });
        }

        let quoted = quote_field(field).map_err(|e| CompileError::invalid(field, e))?;
        let range = window.range().map_err(|reason| CompileError::invalid(field, reason))?;

        let clauses = match range {
            DateRange::Relative(period) => {
                vec![format!("{} >= {}", quoted, resolve_period(period, ctx.today).render())]
            }
            DateRange::Absolute { start, end } => {
                let mut clauses = Vec::with_capacity(2);
                if let Some(start) = start {
                    clauses.push(format!("{} >= {}", quoted, DateExpr::Absolute(start).render()));
                }
                if let Some(end) = end {
                    clauses.push(format!("{} <= {}", quoted, DateExpr::Absolute(end).render()));
                }
                clauses
            }
        };
        Ok(clauses)
    }

    fn order_clause(&self, sort: &SortSpec) -> Result<String, CompileError> {
        let def = self.resolve(&sort.field)?;
        let field = def.reference.as_str();
        if def.value_type == ValueType::PlainText {
            return Err(CompileError::invalid(field, "long-text fields cannot be sorted"));
        }
        let quoted = quote_field(field).map_err(|e| CompileError::invalid(field, e))?;

        if field.eq_ignore_ascii_case(refs::CHANGED_DATE) {
            Ok(format!("{} {}", quoted, sort.direction.token()))
        } else {
            Ok(format!("{} {}, {}", quoted, sort.direction.token(), DEFAULT_ORDER))
        }
    }
}

/// Whether the operator restricts a field to the listed values
pub(crate) fn pins_value(op: Operator) -> bool {
    matches!(op, Operator::Eq | Operator::In)
}

pub(crate) fn is_search_operator(op: Operator) -> bool {
    matches!(
        op,
        Operator::Contains
            | Operator::NotContains
            | Operator::ContainsWords
            | Operator::NotContainsWords
            | Operator::Under
            | Operator::NotUnder
    )
}

fn is_current_user(text: &str) -> bool {
    let t = text.trim();
    ["me", "@me", "current user", "myself"]
        .iter()
        .any(|m| t.eq_ignore_ascii_case(m))
}

pub(crate) fn render_value(
    def: &FieldDef,
    literal: &Literal,
    ctx: &CompileContext,
) -> Result<String, CompileError> {
    let field = def.reference.as_str();
    match (def.value_type, literal) {
        (ValueType::Integer, Literal::Integer(n)) => Ok(n.to_string()),
        (ValueType::Integer, Literal::Text(t)) => t
            .trim()
            .parse::<i64>()
            .map(|n| n.to_string())
            .map_err(|_| CompileError::invalid(field, format!("'{}' is not a whole number", t))),
        (ValueType::DateTime, Literal::Text(t)) => render_date(field, t, ctx.today),
        (ValueType::Identity, Literal::Text(t)) if is_current_user(t) => Ok("@Me".to_string()),
        (ValueType::String, Literal::Text(t))
            if field.eq_ignore_ascii_case(refs::TEAM_PROJECT)
                && t.trim().eq_ignore_ascii_case("@project") =>
        {
            Ok("@Project".to_string())
        }
        (ValueType::String, Literal::Integer(n)) => Ok(quote_literal(&n.to_string())),
        (_, Literal::Text(t)) => Ok(quote_literal(t)),
        (value_type, Literal::Integer(n)) => Err(CompileError::invalid(
            field,
            format!("expected a {} value, got the number {}", value_type, n),
        )),
    }
}

fn render_date(field: &str, text: &str, today: NaiveDate) -> Result<String, CompileError> {
    let t = text.trim();

    if let Some(period) = RelativePeriod::parse(t) {
        return Ok(resolve_period(period, today).render());
    }
    if let Some(expr) = parse_date_macro(t) {
        return Ok(expr);
    }
    if let Ok(date) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Ok(DateExpr::Absolute(date).render());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Ok(DateExpr::Absolute(dt.date_naive()).render());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S") {
        return Ok(DateExpr::Absolute(dt.date()).render());
    }

    Err(CompileError::invalid(
        field,
        format!("'{}' is not a date, date macro or relative period", text),
    ))
}

fn free_text_clause(terms: &[String]) -> Result<String, CompileError> {
    let mut groups = Vec::with_capacity(terms.len());
    for term in terms {
        let term = term.trim();
        if term.is_empty() {
            return Err(CompileError::invalid("free_text_terms", "search terms cannot be blank"));
        }
        let literal = quote_literal(term);
        groups.push(format!(
            "([{}] {} {} OR [{}] {} {})",
            refs::TITLE,
            Operator::Contains,
            literal,
            refs::DESCRIPTION,
            Operator::ContainsWords,
            literal
        ));
    }

    if groups.len() == 1 {
        Ok(groups.remove(0))
    } else {
        Ok(format!("({})", groups.join(" OR ")))
    }
}

fn assemble(clauses: &[String], order: &str, cap: usize, include: AuxiliaryData) -> CompiledQuery {
    let columns = CORE_COLUMNS
        .iter()
        .map(|c| format!("[{}]", c))
        .collect::<Vec<_>>()
        .join(", ");

    let text = format!(
        "SELECT {} FROM WorkItems WHERE {} ORDER BY {}",
        columns,
        clauses.join(" AND "),
        order
    );
    CompiledQuery::new(text, cap, include)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adoq_domain::SortDirection;

    fn ctx() -> CompileContext {
        CompileContext::new(None).with_today(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap())
    }

    fn compile(spec: &FilterSpec) -> Result<CompiledQuery, CompileError> {
        Compiler::standard().compile(spec, &ctx())
    }

    #[test]
    fn test_empty_filter_rejected() {
        assert_eq!(compile(&FilterSpec::default()), Err(CompileError::EmptyFilter));

        let spec = FilterSpec::builder()
            .date_window(DateWindow::relative("changed", RelativePeriod::Today))
            .build();
        assert_eq!(compile(&spec), Err(CompileError::EmptyFilter));
    }

    #[test]
    fn test_ids_are_deduplicated() {
        let spec = FilterSpec::builder().ids([5, 3, 5]).build();
        let query = compile(&spec).unwrap();
        assert!(query.text().contains("[System.Id] IN (5, 3)"));

        let spec = FilterSpec::builder().ids([0]).build();
        assert!(matches!(compile(&spec), Err(CompileError::InvalidValue { .. })));
    }

    #[test]
    fn test_literals_are_escaped() {
        let spec = FilterSpec::builder().assigned_to("Dana O'Neil").build();
        let query = compile(&spec).unwrap();
        assert!(query.text().contains("[System.AssignedTo] = 'Dana O''Neil'"));
    }

    #[test]
    fn test_current_user_becomes_macro() {
        let spec = FilterSpec::builder().assigned_to("me").build();
        let query = compile(&spec).unwrap();
        assert!(query.text().contains("[System.AssignedTo] = @Me"));
    }

    #[test]
    fn test_tree_path_rejects_equality() {
        let spec = FilterSpec::builder()
            .predicate(Predicate::new("area", Operator::Eq, "Contoso\\Web"))
            .build();
        assert_eq!(
            compile(&spec),
            Err(CompileError::OperatorTypeMismatch {
                field: refs::AREA_PATH.to_string(),
                operator: Operator::Eq,
                value_type: ValueType::TreePath,
            })
        );
    }

    #[test]
    fn test_integer_field_rejects_words() {
        let spec = FilterSpec::builder()
            .predicate(Predicate::new("priority", Operator::Eq, "high"))
            .build();
        assert!(matches!(compile(&spec), Err(CompileError::InvalidValue { .. })));

        let spec = FilterSpec::builder()
            .predicate(Predicate::new("priority", Operator::Le, "2"))
            .build();
        assert!(compile(&spec).unwrap().text().contains("[Microsoft.VSTS.Common.Priority] <= 2"));
    }

    #[test]
    fn test_in_requires_values() {
        let spec = FilterSpec::builder()
            .predicate(Predicate::list("state", Operator::In, Vec::<String>::new()))
            .build();
        assert!(matches!(compile(&spec), Err(CompileError::InvalidValue { .. })));

        let spec = FilterSpec::builder()
            .predicate(Predicate::list("state", Operator::Eq, ["A", "B"]))
            .build();
        assert!(matches!(compile(&spec), Err(CompileError::InvalidValue { .. })));
    }

    #[test]
    fn test_date_literals() {
        let spec = FilterSpec::builder()
            .predicate(Predicate::new("created", Operator::Ge, "2024-01-31T10:00:00Z"))
            .predicate(Predicate::new("closed", Operator::Lt, "last 2 weeks"))
            .build();
        let text = compile(&spec).unwrap().text().to_string();
        assert!(text.contains("[System.CreatedDate] >= '2024-01-31'"));
        assert!(text.contains("[Microsoft.VSTS.Common.ClosedDate] < @Today - 14"));

        let spec = FilterSpec::builder()
            .predicate(Predicate::new("created", Operator::Ge, "next tuesday"))
            .build();
        assert!(matches!(compile(&spec), Err(CompileError::InvalidValue { .. })));
    }

    #[test]
    fn test_absolute_window() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let spec = FilterSpec::builder()
            .free_text("login")
            .date_window(DateWindow::between("created", Some(d("2024-01-01")), Some(d("2024-03-31"))))
            .build();
        let text = compile(&spec).unwrap().text().to_string();
        assert!(text.contains(
            "[System.CreatedDate] >= '2024-01-01' AND [System.CreatedDate] <= '2024-03-31'"
        ));
    }

    #[test]
    fn test_date_window_needs_date_field() {
        let spec = FilterSpec::builder()
            .ids([1])
            .date_window(DateWindow::relative("title", RelativePeriod::Today))
            .build();
        assert!(matches!(
            compile(&spec),
            Err(CompileError::OperatorTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_free_text_terms() {
        let spec = FilterSpec::builder().free_text("crash").free_text("hang").build();
        let text = compile(&spec).unwrap().text().to_string();
        assert!(text.contains(
            "(([System.Title] CONTAINS 'crash' OR [System.Description] CONTAINS WORDS 'crash') OR ([System.Title] CONTAINS 'hang' OR [System.Description] CONTAINS WORDS 'hang'))"
        ));

        let spec = FilterSpec::builder().free_text("   ").build();
        assert!(matches!(compile(&spec), Err(CompileError::InvalidValue { .. })));
    }

    #[test]
    fn test_explicit_scope_is_not_duplicated() {
        let spec = FilterSpec::builder()
            .ids([1])
            .predicate(Predicate::new("project", Operator::Eq, "Contoso"))
            .build();
        let text = compile(&spec).unwrap().text().to_string();
        assert_eq!(text.matches("[System.TeamProject]").count(), 1);
        assert!(!text.contains("@Project"));
    }

    #[test]
    fn test_negative_project_constraint_keeps_scope() {
        for predicate in [
            Predicate::new("project", Operator::Ne, "Legacy"),
            Predicate::list("project", Operator::NotIn, ["Legacy", "Archive"]),
            Predicate::new("project", Operator::Contains, "Con"),
        ] {
            let spec = FilterSpec::builder()
                .work_item_types(["Bug"])
                .predicate(predicate)
                .build();
            let text = compile(&spec).unwrap().text().to_string();
            assert!(
                text.contains("WHERE [System.TeamProject] = @Project AND "),
                "unscoped: {}",
                text
            );
        }

        let spec = FilterSpec::builder()
            .ids([1])
            .predicate(Predicate::list("project", Operator::In, ["A", "B"]))
            .build();
        let text = compile(&spec).unwrap().text().to_string();
        assert!(!text.contains("@Project"));
        assert!(text.contains("[System.TeamProject] IN ('A', 'B')"));
    }

    #[test]
    fn test_context_project_is_quoted() {
        let ctx = CompileContext::new(Some("Team's App".to_string()));
        assert_eq!(ctx.scope_predicate(), "[System.TeamProject] = 'Team''s App'");
        assert_eq!(CompileContext::new(Some("  ".to_string())).project, None);
    }

    #[test]
    fn test_sort_and_cap() {
        let spec = FilterSpec::builder()
            .ids([1])
            .sort("priority", SortDirection::Asc)
            .max_items(5000)
            .build();
        let query = compile(&spec).unwrap();
        assert!(query
            .text()
            .ends_with("ORDER BY [Microsoft.VSTS.Common.Priority] ASC, [System.ChangedDate] DESC"));
        assert_eq!(query.result_cap(), 1000);

        let spec = FilterSpec::builder().ids([1]).max_items(0).build();
        assert!(matches!(compile(&spec), Err(CompileError::InvalidValue { .. })));

        let spec = FilterSpec::builder().ids([1]).sort("description", SortDirection::Asc).build();
        assert!(compile(&spec).is_err());
    }

    #[test]
    fn test_include_flags_travel_with_query() {
        let spec = FilterSpec::builder().ids([1]).include_history(true).build();
        let query = compile(&spec).unwrap();
        assert!(query.include().history);
        assert!(!query.include().comments);
    }

    #[test]
    fn test_fragment_and_filter_shapes_agree() {
        let compiler = Compiler::standard();
        let from_filter = compiler
            .compile_input(
                &QueryInput::Filter(FilterSpec::builder().states_in(["Active"]).build()),
                &ctx(),
            )
            .unwrap();
        let from_fragment = compiler
            .compile_input(&QueryInput::Fragment("WHERE [State] = 'Active'".into()), &ctx())
            .unwrap();

        assert!(from_filter.text().contains("[System.State] = 'Active'"));
        assert!(from_fragment.text().contains("AND ([System.State] = 'Active')"));
        assert_eq!(from_filter.result_cap(), from_fragment.result_cap());
        for q in [&from_filter, &from_fragment] {
            assert!(q.text().starts_with("SELECT [System.Id], [System.Title]"));
            assert!(q.text().ends_with("ORDER BY [System.ChangedDate] DESC"));
            assert_eq!(q.text().matches("[System.TeamProject]").count(), 1);
        }
    }

    #[test]
    fn test_fragment_scope_survives_or_and_negation() {
        let compiler = Compiler::standard();
        for clause in [
            "[System.TeamProject] = 'Legacy' OR [System.State] = 'Active'",
            "[System.TeamProject] <> 'Legacy'",
            "NOT [System.TeamProject] = 'Legacy'",
        ] {
            let query = compiler.compile_fragment(clause, &ctx()).unwrap();
            assert!(
                query.text().contains(&format!("WHERE [System.TeamProject] = @Project AND ({})", clause)),
                "scope missing: {}",
                query.text()
            );
        }

        let pinned = compiler
            .compile_fragment("[System.TeamProject] = 'Legacy' AND [System.State] = 'Active'", &ctx())
            .unwrap();
        assert!(!pinned.text().contains("@Project"));
        assert!(pinned
            .text()
            .contains("WHERE ([System.TeamProject] = 'Legacy' AND [System.State] = 'Active')"));
    }

    #[test]
    fn test_check_does_not_need_context() {
        let compiler = Compiler::standard();
        assert!(compiler.check(&FilterSpec::builder().ids([1]).build()).is_ok());
        assert!(compiler.check(&FilterSpec::default()).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn sample_value(value_type: ValueType) -> Literal {
        match value_type {
            ValueType::Integer => Literal::Integer(3),
            ValueType::DateTime => Literal::text("2024-01-01"),
            ValueType::Identity => Literal::text("Jane Doe"),
            ValueType::TreePath => Literal::text("Contoso\\Web"),
            ValueType::String | ValueType::PlainText => Literal::text("sample"),
        }
    }

    proptest! {
        /// Property: compile succeeds exactly for compatible pairs, and the
        /// operator token appears verbatim when it does
        #[test]
        fn test_compatibility_table(ty_idx in 0usize..6, op_idx in 0usize..14) {
            let value_type = ValueType::ALL[ty_idx];
            let op = Operator::ALL[op_idx];
            let registry = FieldRegistry::standard()
                .with_field("sample", FieldDef::new("Custom.Sample", value_type));
            let compiler = Compiler::new(Arc::new(registry), CompilerConfig::default());

            let value = sample_value(value_type);
            let predicate = if op.takes_list() {
                Predicate::list("sample", op, [value])
            } else {
                Predicate::new("sample", op, value)
            };
            let spec = FilterSpec::builder().predicate(predicate).build();
            let result = compiler.compile(&spec, &CompileContext::default());

            if value_type.accepts(op) {
                let query = result.map_err(|e| TestCaseError::fail(e.to_string()))?;
                let expected = format!("[Custom.Sample] {} ", op.token());
                prop_assert!(query.text().contains(&expected), "{}", query.text());
            } else {
                let is_mismatch = matches!(result, Err(CompileError::OperatorTypeMismatch { .. }));
                prop_assert!(is_mismatch);
            }
        }

        /// Property: the query is pinned to one project set exactly once;
        /// negative project constraints come on top of the context scope
        #[test]
        fn test_scope_predicate_once(
            explicit in proptest::option::of(0usize..4),
            project in proptest::option::of("[A-Za-z' ]{1,12}"),
        ) {
            let ops = [Operator::Eq, Operator::In, Operator::Ne, Operator::NotIn];
            let mut builder = FilterSpec::builder().ids([1]);
            if let Some(idx) = explicit {
                let op = ops[idx];
                let predicate = if op.takes_list() {
                    Predicate::list("project", op, ["Contoso"])
                } else {
                    Predicate::new("project", op, "Contoso")
                };
                builder = builder.predicate(predicate);
            }
            let ctx = CompileContext::new(project);
            let query = Compiler::standard()
                .compile(&builder.build(), &ctx)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            let pinned = matches!(explicit, Some(0) | Some(1));
            let scope = format!("WHERE {} AND ", ctx.scope_predicate());
            prop_assert_eq!(query.text().contains(&scope), !pinned, "{}", query.text());

            let mentions = query.text().matches("[System.TeamProject]").count();
            let expected = if explicit.is_some() && !pinned { 2 } else { 1 };
            prop_assert_eq!(mentions, expected);
        }
    }
}
