use std::sync::LazyLock;
use regex::Regex;

static FINDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^find_(all_)?by_(.+?)(!)?$").expect("finder pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    All,
}

/// Structured form of a `find_(all_)by_<field>[_and_<field>]*(!)` name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderSpec {
    pub cardinality: Cardinality,
    pub bang: bool,
    pub fields: Vec<String>,
}

impl FinderSpec {
    pub fn returns_all(&self) -> bool {
        self.cardinality == Cardinality::All
    }
}

/// Parse a method name into a finder spec.
///
/// `find_all_by_*!` is not a finder: the all-cardinality form never raises,
/// so the name falls through to the missing-method path.
pub fn resolve(method_name: &str) -> Option<FinderSpec> {
    let captures = FINDER_PATTERN.captures(method_name)?;

    let cardinality = if captures.get(1).is_some() {
        Cardinality::All
    } else {
        Cardinality::One
    };
    let bang = captures.get(3).is_some();
    if bang && cardinality == Cardinality::All {
        return None;
    }

    let fields: Vec<String> = captures[2]
        .split("_and_")
        .map(str::to_string)
        .collect();
    if fields.iter().any(|f| f.is_empty()) {
        return None;
    }

    Some(FinderSpec {
        cardinality,
        bang,
        fields,
    })
}
