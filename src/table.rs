use crate::common::{NonEmpty, NonZeroUInt, UInt};
use crate::roll::RandomSource;
use std::collections::{HashMap, HashSet};
use std::fmt;

pub const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TableError {
    #[error("no table named {0:?} is registered")]
    NotFound(String),
    #[error("circular table reference: {}", path.join(" -> "))]
    Circular { path: Vec<String> },
    #[error("table {table:?} references unknown table {reference:?}")]
    MissingReference { table: String, reference: String },
    #[error("table reference chain exceeds the depth limit of {limit}")]
    RecursionLimit { limit: usize },
    #[error("a table definition must have at least one entry")]
    EmptyDefinition,
    #[error("a table may use range weights or percent weights, not both")]
    MixedWeightStyles,
    #[error("bad table entry on line {line}: {reason}")]
    BadEntry { line: usize, reason: String },
    #[error("a table definition must start with an @name header line")]
    BadHeader,
}

/// One weighted outcome. `reference` names another table to roll on when
/// this entry is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub weight: NonZeroUInt,
    pub text: String,
    pub reference: Option<String>,
}

impl TableEntry {
    pub fn new(weight: NonZeroUInt, text: String, reference: Option<String>) -> Self {
        Self {
            weight,
            text,
            reference,
        }
    }
}

/// The weight notations a definition may use. Flat integers mix freely
/// with either of the other two; ranges and percents never mix.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
enum WeightStyle {
    Flat,
    Range,
    Percent,
}

/// A named weighted table. A draw in `[1, total_weight]` selects the entry
/// whose cumulative weight interval contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomTable {
    name: String,
    entries: NonEmpty<TableEntry>,
}

impl RandomTable {
    pub fn new(name: String, entries: NonEmpty<TableEntry>) -> Self {
        Self { name, entries }
    }

    /// Parses the line-oriented definition format:
    ///
    /// ```text
    /// @loot
    /// 1-3 : nothing
    /// 4-5 : 2d6 gold
    /// 6   : a gem -> @gems
    /// ```
    ///
    /// The header names the table; each entry is a weight, a colon, the
    /// result text and an optional `-> @table` reference. Weights are flat
    /// integers, inclusive ranges (`1-3` weighs 3) or percents (`40%`
    /// weighs 40). Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let name = match lines.next() {
            Some((_, header)) => parse_header(header)?,
            None => return Err(TableError::BadHeader),
        };

        let mut entries = Vec::new();
        let mut styles = HashSet::new();
        for (line, text) in lines {
            let (entry, style) = parse_entry(line, text)?;
            entries.push(entry);
            styles.insert(style);
        }
        if styles.contains(&WeightStyle::Range) && styles.contains(&WeightStyle::Percent) {
            return Err(TableError::MixedWeightStyles);
        }

        let entries = NonEmpty::try_from_vec(entries).map_err(|_| TableError::EmptyDefinition)?;
        Ok(Self { name, entries })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn total_weight(&self) -> UInt {
        self.entries.iter().map(|e| e.weight.get()).sum()
    }

    /// Maps a draw to its entry by walking the cumulative weights. Entries
    /// own the intervals in declaration order, so weights 2 and 3 give the
    /// first entry draws 1..=2 and the second draws 3..=5.
    pub fn resolve(&self, draw: UInt) -> &TableEntry {
        let mut cumulative = 0;
        for entry in &self.entries {
            cumulative += entry.weight.get();
            if draw <= cumulative {
                return entry;
            }
        }
        // Draws are produced in [1, total_weight], so this is unreachable
        // unless the caller passed an out-of-range value.
        self.entries.last()
    }
}

fn parse_header(header: &str) -> Result<String, TableError> {
    let name = header.strip_prefix('@').ok_or(TableError::BadHeader)?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(TableError::BadHeader);
    }
    Ok(name.to_string())
}

fn parse_entry(line: usize, text: &str) -> Result<(TableEntry, WeightStyle), TableError> {
    let bad = |reason: &str| TableError::BadEntry {
        line,
        reason: reason.to_string(),
    };

    let (weight_text, rest) = text.split_once(':').ok_or_else(|| bad("missing ':'"))?;
    let (weight, style) = parse_weight(line, weight_text.trim())?;

    // Definitions in the wild use either arrow spelling.
    let (result, reference) = match rest.split_once("->").or_else(|| rest.split_once('→')) {
        Some((result, reference)) => {
            let reference = reference
                .trim()
                .strip_prefix('@')
                .ok_or_else(|| bad("reference must name a table as @name"))?;
            if reference.is_empty() {
                return Err(bad("reference must name a table as @name"));
            }
            (result.trim(), Some(reference.to_string()))
        }
        None => (rest.trim(), None),
    };
    if result.is_empty() {
        return Err(bad("missing result text"));
    }

    Ok((
        TableEntry::new(weight, result.to_string(), reference),
        style,
    ))
}

fn parse_weight(line: usize, text: &str) -> Result<(NonZeroUInt, WeightStyle), TableError> {
    let bad = |reason: &str| TableError::BadEntry {
        line,
        reason: reason.to_string(),
    };

    if let Some(percent) = text.strip_suffix('%') {
        let value: UInt = percent
            .trim()
            .parse()
            .map_err(|_| bad("percent weight is not a number"))?;
        let weight = NonZeroUInt::new(value).ok_or_else(|| bad("weight must be at least 1"))?;
        return Ok((weight, WeightStyle::Percent));
    }
    if let Some((lo, hi)) = text.split_once('-') {
        let lo: UInt = lo
            .trim()
            .parse()
            .map_err(|_| bad("range bound is not a number"))?;
        let hi: UInt = hi
            .trim()
            .parse()
            .map_err(|_| bad("range bound is not a number"))?;
        if hi < lo {
            return Err(bad("range upper bound is below its lower bound"));
        }
        let weight = NonZeroUInt::new(hi - lo + 1)
            .ok_or_else(|| bad("weight must be at least 1"))?;
        return Ok((weight, WeightStyle::Range));
    }
    let value: UInt = text.parse().map_err(|_| bad("weight is not a number"))?;
    let weight = NonZeroUInt::new(value).ok_or_else(|| bad("weight must be at least 1"))?;
    Ok((weight, WeightStyle::Flat))
}

/// The full trace of one table evaluation, nested references included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEvaluationResult {
    pub table: String,
    pub roll: UInt,
    pub primary_result: String,
    pub nested_results: Vec<TableEvaluationResult>,
    pub depth: usize,
}

impl TableEvaluationResult {
    /// The text at the end of the reference chain.
    pub fn final_result_text(&self) -> &str {
        match self.nested_results.last() {
            Some(nested) => nested.final_result_text(),
            None => &self.primary_result,
        }
    }
}

impl fmt::Display for TableEvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} ({}): {}", self.table, self.roll, self.primary_result)?;
        for nested in &self.nested_results {
            write!(f, " -> {}", nested)?;
        }
        Ok(())
    }
}

/// Registry of named tables. Reference chains are bounded by `max_depth`;
/// `validate` additionally rejects cycles and dangling references up front.
#[derive(Debug, Default)]
pub struct TableManager {
    tables: HashMap<String, RandomTable>,
    max_depth: usize,
}

impl TableManager {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            tables: HashMap::new(),
            max_depth,
        }
    }

    /// Registers a table, returning the table it replaced, if any.
    pub fn register(&mut self, table: RandomTable) -> Option<RandomTable> {
        self.tables.insert(table.name().to_string(), table)
    }

    pub fn unregister(&mut self, name: &str) -> Option<RandomTable> {
        self.tables.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&RandomTable> {
        self.tables.get(name)
    }

    /// Registered table names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// The numeric form of a lookup: one draw on the named table, without
    /// following references.
    pub fn roll_value<R: RandomSource>(
        &self,
        name: &str,
        source: &mut R,
    ) -> Result<UInt, TableError> {
        let table = self
            .tables
            .get(name)
            .ok_or_else(|| TableError::NotFound(name.to_string()))?;
        Ok(self.draw(table, source))
    }

    /// Rolls on the named table and follows its reference chain, producing
    /// the full evaluation trace.
    pub fn evaluate<R: RandomSource>(
        &self,
        name: &str,
        source: &mut R,
    ) -> Result<TableEvaluationResult, TableError> {
        self.evaluate_at(name, source, 0)
    }

    fn evaluate_at<R: RandomSource>(
        &self,
        name: &str,
        source: &mut R,
        depth: usize,
    ) -> Result<TableEvaluationResult, TableError> {
        if depth >= self.max_depth {
            return Err(TableError::RecursionLimit {
                limit: self.max_depth,
            });
        }
        let table = self
            .tables
            .get(name)
            .ok_or_else(|| TableError::NotFound(name.to_string()))?;
        let roll = self.draw(table, source);
        let entry = table.resolve(roll);

        let mut nested_results = Vec::new();
        if let Some(reference) = &entry.reference {
            nested_results.push(self.evaluate_at(reference, source, depth + 1)?);
        }
        Ok(TableEvaluationResult {
            table: name.to_string(),
            roll,
            primary_result: entry.text.clone(),
            nested_results,
            depth,
        })
    }

    fn draw<R: RandomSource>(&self, table: &RandomTable, source: &mut R) -> UInt {
        // Entries are non-empty with weights of at least 1.
        let total = NonZeroUInt::new(table.total_weight()).unwrap();
        source.roll(total)
    }

    /// Statically checks every registered table: each reference must name a
    /// registered table and no reference chain may revisit a table.
    pub fn validate(&self) -> Result<(), TableError> {
        let mut done = HashSet::new();
        let mut path = Vec::new();
        for name in self.tables.keys() {
            self.validate_from(name, &mut path, &mut done)?;
        }
        Ok(())
    }

    fn validate_from(
        &self,
        name: &str,
        path: &mut Vec<String>,
        done: &mut HashSet<String>,
    ) -> Result<(), TableError> {
        if done.contains(name) {
            return Ok(());
        }
        if path.iter().any(|seen| seen == name) {
            let mut cycle = path.clone();
            cycle.push(name.to_string());
            return Err(TableError::Circular { path: cycle });
        }
        let table = match self.tables.get(name) {
            Some(table) => table,
            // Dangling references are reported against the referring table.
            None => return Ok(()),
        };
        path.push(name.to_string());
        for entry in table.entries() {
            if let Some(reference) = &entry.reference {
                if !self.tables.contains_key(reference) {
                    return Err(TableError::MissingReference {
                        table: name.to_string(),
                        reference: reference.clone(),
                    });
                }
                self.validate_from(reference, path, done)?;
            }
        }
        path.pop();
        done.insert(name.to_string());
        Ok(())
    }
}
