//! Static test catalog
//!
//! Cases are declared as definitions with one or more payload variants.
//! A definition with several variants expands into one [`TestCase`] per
//! variant, with derived identifiers `REG_007_1`, `REG_007_2`, ... so every
//! identifier in a catalog stays unique.
//!
//! Definitions come from the built-in registration suite
//! ([`Catalog::registration`]) or from declarative YAML files
//! ([`Catalog::from_yaml`], [`Catalog::load_dir`]).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use regcheck_common::{Category, Expectation, Payload, Priority, TestCase};

use crate::error::{E2eError, E2eResult};

/// Ordered, immutable set of test cases
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    cases: Vec<TestCase>,
}

/// Restricts which cases are listed or executed
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    /// Keep only identifiers starting with this prefix
    pub id_prefix: Option<String>,
}

impl CaseFilter {
    pub fn matches(&self, case: &TestCase) -> bool {
        self.category.map_or(true, |c| c == case.category)
            && self.priority.map_or(true, |p| p == case.priority)
            && self
                .id_prefix
                .as_deref()
                .map_or(true, |prefix| case.id.starts_with(prefix))
    }
}

impl Catalog {
    /// Build a catalog, ordering cases by category and rejecting duplicate ids.
    ///
    /// Declaration order is kept within a category.
    pub fn new(mut cases: Vec<TestCase>) -> E2eResult<Self> {
        let mut seen = HashSet::new();
        for case in &cases {
            if !seen.insert(case.id.as_str()) {
                return Err(E2eError::DuplicateCase(case.id.clone()));
            }
        }
        cases.sort_by_key(|c| c.category.rank());
        Ok(Self { cases })
    }

    /// Expand definitions into a catalog
    pub fn from_definitions(definitions: Vec<CaseDefinition>) -> E2eResult<Self> {
        let cases = definitions
            .into_iter()
            .flat_map(CaseDefinition::expand)
            .collect();
        Self::new(cases)
    }

    /// Built-in user registration suite.
    ///
    /// `stamp` (unix seconds) feeds the unique username/email generators so the
    /// catalog is reproducible for a given stamp.
    pub fn registration(stamp: i64) -> E2eResult<Self> {
        Self::from_definitions(registration_definitions(stamp))
    }

    /// Parse a catalog from a YAML document
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        let definitions = file
            .cases
            .into_iter()
            .map(CaseSpec::into_definition)
            .collect::<E2eResult<Vec<_>>>()?;
        Self::from_definitions(definitions)
    }

    /// Parse a catalog from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            E2eError::Yaml(err) => E2eError::Catalog(format!("{}: {}", path.display(), err)),
            other => other,
        })
    }

    /// Load every `*.yaml` / `*.yml` catalog file under a directory.
    ///
    /// Files are read in path order so the merged catalog is stable.
    pub fn load_dir(dir: &Path) -> E2eResult<Self> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        let mut cases = Vec::new();
        for path in paths {
            cases.extend(Self::from_file(&path)?.cases);
        }
        Self::new(cases)
    }

    /// Cases matching the filter, in catalog order
    pub fn list_cases(&self, filter: &CaseFilter) -> Vec<&TestCase> {
        self.cases.iter().filter(|c| filter.matches(c)).collect()
    }

    /// A new catalog holding only the matching cases
    pub fn filtered(&self, filter: &CaseFilter) -> Self {
        Self {
            cases: self.list_cases(filter).into_iter().cloned().collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.id == id)
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// One declared case, possibly with several payload variants
#[derive(Debug, Clone)]
pub struct CaseDefinition {
    pub id: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub variants: Vec<Variant>,
}

/// A single payload/expectation pair of a definition
#[derive(Debug, Clone)]
pub struct Variant {
    /// Appended to the description of expanded cases
    pub label: Option<String>,
    pub payload: Payload,
    pub expected: Expectation,
}

impl Variant {
    pub fn new(payload: Payload, expected: Expectation) -> Self {
        Self {
            label: None,
            payload,
            expected,
        }
    }

    pub fn labeled(label: impl Into<String>, payload: Payload, expected: Expectation) -> Self {
        Self {
            label: Some(label.into()),
            payload,
            expected,
        }
    }
}

impl CaseDefinition {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        category: Category,
        priority: Priority,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            category,
            priority,
            variants: Vec::new(),
        }
    }

    pub fn variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    /// Single-payload shorthand
    pub fn single(self, payload: Payload, expected: Expectation) -> Self {
        self.variant(Variant::new(payload, expected))
    }

    /// Expand into concrete test cases
    pub fn expand(self) -> Vec<TestCase> {
        let multi = self.variants.len() > 1;
        self.variants
            .into_iter()
            .enumerate()
            .map(|(i, variant)| {
                let id = if multi {
                    format!("{}_{}", self.id, i + 1)
                } else {
                    self.id.clone()
                };
                let description = match &variant.label {
                    Some(label) if multi => format!("{}: {}", self.description, label),
                    _ => self.description.clone(),
                };
                TestCase {
                    id,
                    description,
                    category: self.category,
                    priority: self.priority,
                    payload: variant.payload,
                    expected: variant.expected,
                }
            })
            .collect()
    }
}

/// Top-level layout of a YAML catalog file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub cases: Vec<CaseSpec>,
}

/// A case as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSpec {
    pub id: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_category")]
    pub category: Category,

    #[serde(default)]
    pub priority: Priority,

    /// Start from the valid registration template before applying `payload`
    #[serde(default)]
    pub from_valid: bool,

    /// Field values shared by every variant
    #[serde(default)]
    pub payload: BTreeMap<String, String>,

    #[serde(default)]
    pub expect: ExpectKind,

    /// Required substring of the error message
    #[serde(default)]
    pub error_contains: Option<String>,

    #[serde(default)]
    pub variants: Vec<VariantSpec>,
}

/// A variant as written in YAML; unset fields inherit from the case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSpec {
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub payload: BTreeMap<String, String>,

    #[serde(default)]
    pub expect: Option<ExpectKind>,

    #[serde(default)]
    pub error_contains: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectKind {
    #[default]
    Success,
    Error,
}

fn default_category() -> Category {
    Category::Other
}

fn expectation(kind: ExpectKind, contains: Option<String>) -> Expectation {
    match kind {
        ExpectKind::Success => Expectation::Success,
        ExpectKind::Error => Expectation::Error(contains),
    }
}

impl CaseSpec {
    fn into_definition(self) -> E2eResult<CaseDefinition> {
        if self.id.trim().is_empty() {
            return Err(E2eError::Catalog("case with empty id".to_string()));
        }

        let mut base = if self.from_valid {
            valid_payload()
        } else {
            Payload::new()
        };
        for (field, value) in &self.payload {
            base.set(field.clone(), value.clone());
        }

        let mut definition =
            CaseDefinition::new(self.id, self.description, self.category, self.priority);

        if self.variants.is_empty() {
            return Ok(definition.single(base, expectation(self.expect, self.error_contains)));
        }

        for spec in self.variants {
            let mut payload = base.clone();
            for (field, value) in spec.payload {
                payload.set(field, value);
            }
            let kind = spec.expect.unwrap_or(self.expect);
            let contains = spec.error_contains.or_else(|| self.error_contains.clone());
            definition = definition.variant(Variant {
                label: spec.label,
                payload,
                expected: expectation(kind, contains),
            });
        }
        Ok(definition)
    }
}

/// Valid registration data used as the base of most cases
pub fn valid_payload() -> Payload {
    Payload::new()
        .with("username", "testuser123")
        .with("email", "test@example.com")
        .with("password", "SecurePass123!")
        .with("confirm_password", "SecurePass123!")
        .with("first_name", "John")
        .with("last_name", "Doe")
        .with("phone", "+1234567890")
}

/// Valid payload with a username/email unique to `prefix` and `stamp`
fn unique_payload(prefix: &str, stamp: i64) -> Payload {
    valid_payload()
        .with("username", format!("{}_{}", prefix, stamp))
        .with("email", format!("{}_{}@example.com", prefix, stamp))
}

fn valid_with(field: &str, value: impl Into<String>) -> Payload {
    valid_payload().with(field, value)
}

fn registration_definitions(stamp: i64) -> Vec<CaseDefinition> {
    use Category::*;
    use Priority::*;

    let success = || Expectation::Success;
    let error = |s: &str| Expectation::error_containing(s);

    vec![
        // Positive
        CaseDefinition::new("REG_001", "Successful registration with valid data", Positive, High)
            .single(unique_payload("user", stamp), success()),
        CaseDefinition::new("REG_002", "Registration with minimum required fields", Positive, High)
            .single(
                Payload::new()
                    .with("username", format!("minuser_{}", stamp))
                    .with("email", format!("min_{}@example.com", stamp))
                    .with("password", "MinPass123!"),
                success(),
            ),
        CaseDefinition::new("REG_003", "Registration with all optional fields", Positive, Medium)
            .single(
                unique_payload("complete", stamp)
                    .with("middle_name", "Middle")
                    .with("date_of_birth", "1990-01-01")
                    .with("address", "123 Test Street")
                    .with("city", "Test City")
                    .with("country", "Test Country"),
                success(),
            ),
        // Negative
        CaseDefinition::new("REG_004", "Registration with empty username", Negative, High)
            .single(valid_with("username", ""), error("Username is required")),
        CaseDefinition::new("REG_005", "Registration with empty email", Negative, High)
            .single(valid_with("email", ""), error("Email is required")),
        CaseDefinition::new("REG_006", "Registration with empty password", Negative, High)
            .single(
                valid_with("password", "").with("confirm_password", ""),
                error("Password is required"),
            ),
        variants(
            CaseDefinition::new("REG_007", "Registration with invalid email", Negative, High),
            [
                "invalid-email",
                "@example.com",
                "test@",
                "test..test@example.com",
                "test@example",
                "test@.com",
            ],
            |email| valid_with("email", email),
            || error("valid email address"),
        ),
        CaseDefinition::new("REG_008", "Registration with duplicate username", Negative, High)
            .single(valid_with("username", "existinguser"), error("already exists")),
        CaseDefinition::new("REG_009", "Registration with duplicate email", Negative, High)
            .single(valid_with("email", "existing@example.com"), error("already registered")),
        variants(
            CaseDefinition::new("REG_010", "Registration with weak password", Negative, High),
            ["123", "password", "abc", "12345678"],
            |password| {
                valid_with("password", password).with("confirm_password", password)
            },
            Expectation::error,
        ),
        CaseDefinition::new("REG_011", "Registration with mismatched passwords", Negative, High)
            .single(
                valid_with("confirm_password", "DifferentPassword123!"),
                error("do not match"),
            ),
        // Boundary
        CaseDefinition::new("REG_012", "Username length boundaries", Boundary, Medium)
            .variant(Variant::labeled(
                "2 characters (below minimum)",
                valid_with("username", "ab"),
                error("at least 3 characters"),
            ))
            .variant(Variant::labeled(
                "3 characters (minimum)",
                valid_with("username", "abc"),
                success(),
            ))
            .variant(Variant::labeled(
                "51 characters (above maximum)",
                valid_with("username", "a".repeat(51)),
                error("cannot exceed 50 characters"),
            ))
            .variant(Variant::labeled(
                "50 characters (maximum)",
                valid_with("username", "a".repeat(50)),
                success(),
            )),
        CaseDefinition::new("REG_013", "Password length boundaries", Boundary, Medium)
            .variant(Variant::labeled(
                "6 characters (below minimum)",
                valid_with("password", "Pass1!").with("confirm_password", "Pass1!"),
                error("at least 8 characters"),
            ))
            .variant(Variant::labeled(
                "8 characters (minimum)",
                valid_with("password", "Pass123!").with("confirm_password", "Pass123!"),
                success(),
            )),
        CaseDefinition::new("REG_014", "Email length boundaries", Boundary, Low).single(
            valid_with("email", format!("{}@example.com", "a".repeat(240))),
            success(),
        ),
        // Security
        variants(
            CaseDefinition::new("REG_015", "SQL injection protection", Security, High),
            [
                "admin'; DROP TABLE users; --",
                "' OR '1'='1",
                "admin'/*",
                "1' UNION SELECT * FROM users--",
            ],
            |username| valid_with("username", username),
            || error("Invalid characters"),
        ),
        variants(
            CaseDefinition::new("REG_016", "XSS attack protection", Security, High),
            [
                "<script>alert('XSS')</script>",
                "javascript:alert('XSS')",
                "<img src=x onerror=alert('XSS')>",
                "';alert('XSS');//",
            ],
            |username| valid_with("username", username),
            || error("Invalid characters"),
        ),
        CaseDefinition::new("REG_017", "Password encryption verification", Security, High)
            .single(unique_payload("secure", stamp), success()),
        CaseDefinition::new("REG_018", "CSRF protection", Security, Medium).single(
            unique_payload("csrf", stamp).with("csrf_token", ""),
            Expectation::error(),
        ),
        // UI/UX
        variants(
            CaseDefinition::new("REG_019", "Form field validation messages", UiUx, Medium),
            ["username", "email", "password"],
            |field| valid_with(field, ""),
            || error("required"),
        ),
        CaseDefinition::new("REG_020", "Password visibility toggle", UiUx, Low).single(
            unique_payload("toggle", stamp)
                .with("password", "Vis1ble#Pass")
                .with("confirm_password", "Vis1ble#Pass"),
            success(),
        ),
        CaseDefinition::new("REG_021", "Form field tab order", UiUx, Low)
            .single(unique_payload("taborder", stamp), success()),
        CaseDefinition::new("REG_022", "Responsive design", UiUx, Medium)
            .single(unique_payload("responsive", stamp), success()),
        // Performance
        CaseDefinition::new("REG_023", "Registration response time", Performance, Medium).single(
            Payload::new()
                .with("username", format!("perfuser_{}", stamp))
                .with("email", format!("perf_{}@example.com", stamp))
                .with("password", "PerfPass123!"),
            success(),
        ),
        variants(
            CaseDefinition::new("REG_024", "Concurrent registrations", Performance, Medium),
            ["1", "2", "3"],
            |n| unique_payload(&format!("concurrent{}", n), stamp),
            success,
        ),
        // Accessibility
        CaseDefinition::new("REG_025", "Keyboard navigation", Accessibility, Medium)
            .single(unique_payload("keyboard", stamp), success()),
        CaseDefinition::new("REG_026", "Screen reader compatibility", Accessibility, Medium)
            .single(valid_with("username", ""), error("required")),
        CaseDefinition::new("REG_027", "Color contrast compliance", Accessibility, Low)
            .single(valid_with("email", "invalid-email"), Expectation::error()),
        // Integration
        CaseDefinition::new("REG_028", "Email verification flow", Integration, High)
            .single(unique_payload("verify", stamp), success()),
        CaseDefinition::new("REG_029", "Welcome email sending", Integration, Medium)
            .single(unique_payload("welcome", stamp), success()),
        CaseDefinition::new("REG_030", "User profile creation", Integration, High).single(
            unique_payload("profile", stamp)
                .with("first_name", "Jane")
                .with("last_name", "Smith"),
            success(),
        ),
    ]
}

/// Attach one labeled variant per input value
fn variants<const N: usize>(
    mut definition: CaseDefinition,
    inputs: [&str; N],
    payload: impl Fn(&str) -> Payload,
    expected: impl Fn() -> Expectation,
) -> CaseDefinition {
    for input in inputs {
        definition = definition.variant(Variant::labeled(
            truncate_label(input),
            payload(input),
            expected(),
        ));
    }
    definition
}

fn truncate_label(input: &str) -> String {
    if input.chars().count() > 20 {
        format!("{}...", input.chars().take(20).collect::<String>())
    } else {
        input.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_ids_unique() {
        let catalog = Catalog::registration(1_700_000_000).unwrap();
        let mut ids: Vec<_> = catalog.cases().iter().map(|c| c.id.as_str()).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_variants_get_sub_identifiers() {
        let catalog = Catalog::registration(1).unwrap();
        assert!(catalog.get("REG_007").is_none());
        let first = catalog.get("REG_007_1").unwrap();
        assert_eq!(first.payload.value("email"), "invalid-email");
        assert!(catalog.get("REG_007_6").is_some());
        assert!(catalog.get("REG_007_7").is_none());
        assert_eq!(
            first.description,
            "Registration with invalid email: invalid-email"
        );
    }

    #[test]
    fn test_categories_in_fixed_sequence() {
        let catalog = Catalog::registration(1).unwrap();
        let ranks: Vec<_> = catalog.cases().iter().map(|c| c.category.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);
        assert_eq!(catalog.cases()[0].id, "REG_001");
        assert_eq!(catalog.cases().last().unwrap().id, "REG_030");
    }

    #[test]
    fn test_stamp_feeds_unique_payloads() {
        let catalog = Catalog::registration(1234).unwrap();
        let case = catalog.get("REG_001").unwrap();
        assert_eq!(case.payload.value("username"), "user_1234");
        assert_eq!(case.payload.value("email"), "user_1234@example.com");
    }

    #[test]
    fn test_filter_by_category_and_priority() {
        let catalog = Catalog::registration(1).unwrap();
        let filter = CaseFilter {
            category: Some(Category::Boundary),
            priority: Some(Priority::Low),
            id_prefix: None,
        };
        let cases = catalog.list_cases(&filter);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "REG_014");
    }

    #[test]
    fn test_filter_by_prefix() {
        let catalog = Catalog::registration(1).unwrap();
        let filter = CaseFilter {
            id_prefix: Some("REG_016".into()),
            ..Default::default()
        };
        assert_eq!(catalog.filtered(&filter).len(), 4);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let def = || {
            CaseDefinition::new("X_1", "dup", Category::Other, Priority::Low)
                .single(Payload::new(), Expectation::Success)
        };
        let err = Catalog::from_definitions(vec![def(), def()]).unwrap_err();
        assert!(matches!(err, E2eError::DuplicateCase(id) if id == "X_1"));
    }

    #[test]
    fn test_declaration_order_within_category() {
        let catalog = Catalog::from_definitions(vec![
            CaseDefinition::new("B", "b", Category::Security, Priority::High)
                .single(Payload::new(), Expectation::error()),
            CaseDefinition::new("A", "a", Category::Positive, Priority::High)
                .single(Payload::new(), Expectation::Success),
            CaseDefinition::new("C", "c", Category::Security, Priority::High)
                .single(Payload::new(), Expectation::error()),
        ])
        .unwrap();
        let ids: Vec<_> = catalog.cases().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C"]);
    }

    #[test]
    fn test_parse_yaml_catalog() {
        let yaml = r#"
cases:
  - id: LOGIN_001
    description: Valid registration
    category: Positive
    priority: High
    from_valid: true
  - id: LOGIN_002
    description: Bad email
    category: Negative
    from_valid: true
    expect: error
    error_contains: valid email
    variants:
      - label: no at sign
        payload:
          email: nope
      - label: empty
        payload:
          email: ""
        error_contains: required
"#;
        let catalog = Catalog::from_yaml(yaml).unwrap();
        assert_eq!(catalog.len(), 3);

        let valid = catalog.get("LOGIN_001").unwrap();
        assert_eq!(valid.expected, Expectation::Success);
        assert_eq!(valid.payload.value("username"), "testuser123");

        let second = catalog.get("LOGIN_002_2").unwrap();
        assert_eq!(second.priority, Priority::Medium);
        assert_eq!(second.payload.value("email"), "");
        assert_eq!(second.expected, Expectation::error_containing("required"));
        assert_eq!(second.description, "Bad email: empty");
    }

    #[test]
    fn test_load_dir_merges_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.yaml"),
            "cases:\n  - id: A_1\n    category: Security\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.yml"),
            "cases:\n  - id: B_1\n    category: Positive\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = Catalog::load_dir(dir.path()).unwrap();
        let ids: Vec<_> = catalog.cases().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["B_1", "A_1"]);
    }
}
