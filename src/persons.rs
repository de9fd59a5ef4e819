//! Author identity resolution.
//!
//! Every distinct (name, email) pair observed in history or blame output gets
//! a stable [`PersonId`] handle. Handles are grouped into canonical persons with
//! a union-find forest: two handles join when they share a name or an email.
//! Re-keying after a late merge is therefore a parent-pointer update, and
//! anything that stored a handle resolves to the final person through
//! [`PersonTable::resolve`] once discovery is complete.

use std::collections::{BTreeMap, HashMap};

use glob::{MatchOptions, Pattern};
use parking_lot::RwLock;
use serde::Serialize;

use crate::errors::Result;

/// Handle for one observed (name, email) alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PersonId(u32);

impl PersonId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct Alias {
    name: String,
    email: String,
}

#[derive(Debug, Default)]
struct RegistryInner {
    aliases: Vec<Alias>,
    parent: Vec<u32>,
    by_pair: HashMap<(String, String), u32>,
    by_name: HashMap<String, u32>,
    by_email: HashMap<String, u32>,
}

impl RegistryInner {
    fn find(&self, mut id: u32) -> u32 {
        while self.parent[id as usize] != id {
            id = self.parent[id as usize];
        }
        id
    }

    fn find_compress(&mut self, mut id: u32) -> u32 {
        while self.parent[id as usize] != id {
            let grandparent = self.parent[self.parent[id as usize] as usize];
            self.parent[id as usize] = grandparent;
            id = grandparent;
        }
        id
    }

    /// The older root always wins so the canonical handle is the first alias
    /// observed for that person.
    fn union(&mut self, a: u32, b: u32) {
        let ra = self.find_compress(a);
        let rb = self.find_compress(b);
        if ra != rb {
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[child as usize] = root;
        }
    }
}

/// Thread-safe registry of observed author aliases.
#[derive(Debug)]
pub struct PersonRegistry {
    merge_aliases: bool,
    inner: RwLock<RegistryInner>,
}

impl PersonRegistry {
    /// Create a registry. With `merge_aliases` disabled every distinct
    /// (name, email) pair stays its own person.
    pub fn new(merge_aliases: bool) -> Self {
        Self {
            merge_aliases,
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Register an observation and return the handle of its alias.
    ///
    /// The same (name, email) pair always yields the same handle.
    pub fn add_person(&self, name: &str, email: &str) -> PersonId {
        let key = (name.to_string(), email.to_string());
        if let Some(&id) = self.inner.read().by_pair.get(&key) {
            return PersonId(id);
        }

        let mut inner = self.inner.write();
        if let Some(&id) = inner.by_pair.get(&key) {
            return PersonId(id);
        }

        let id = inner.aliases.len() as u32;
        inner.aliases.push(Alias {
            name: key.0.clone(),
            email: key.1.clone(),
        });
        inner.parent.push(id);

        if self.merge_aliases {
            if !name.is_empty() {
                if let Some(&other) = inner.by_name.get(name) {
                    inner.union(id, other);
                }
            }
            if !email.is_empty() {
                if let Some(&other) = inner.by_email.get(email) {
                    inner.union(id, other);
                }
            }
        }
        inner.by_name.entry(key.0.clone()).or_insert(id);
        if !email.is_empty() {
            inner.by_email.entry(key.1.clone()).or_insert(id);
        }
        inner.by_pair.insert(key, id);

        log::trace!("registered alias {} <{}> as {}", name, email, id);
        PersonId(id)
    }

    /// Canonical handle of the person an alias currently belongs to.
    pub fn canonical(&self, id: PersonId) -> PersonId {
        PersonId(self.inner.read().find(id.0))
    }

    /// Resolve a raw author name to its canonical person.
    pub fn get_person(&self, name: &str) -> Option<Person> {
        let root = {
            let inner = self.inner.read();
            let id = *inner.by_name.get(name)?;
            inner.find(id)
        };
        self.snapshot_unfiltered().persons.remove(&PersonId(root))
    }

    pub fn alias_count(&self) -> usize {
        self.inner.read().aliases.len()
    }

    fn snapshot_unfiltered(&self) -> PersonTable {
        let inner = self.inner.read();
        let canonical: Vec<PersonId> = (0..inner.aliases.len() as u32)
            .map(|id| PersonId(inner.find(id)))
            .collect();

        let mut persons: BTreeMap<PersonId, Person> = BTreeMap::new();
        for (alias, root) in inner.aliases.iter().zip(&canonical) {
            let person = persons.entry(*root).or_insert_with(|| Person {
                id: *root,
                display_name: alias.name.clone(),
                names: Vec::new(),
                emails: Vec::new(),
                filter_matched: false,
            });
            if !person.names.contains(&alias.name) {
                person.names.push(alias.name.clone());
            }
            if !alias.email.is_empty() && !person.emails.contains(&alias.email) {
                person.emails.push(alias.email.clone());
            }
        }

        PersonTable { canonical, persons }
    }

    /// Freeze the current identity merge state and evaluate exclusion patterns
    /// against every canonical person.
    ///
    /// Call only after every history and blame pass has registered its
    /// observations.
    pub fn snapshot(&self, exclusions: &ExclusionPatterns) -> PersonTable {
        let mut table = self.snapshot_unfiltered();
        for person in table.persons.values_mut() {
            person.filter_matched = exclusions.matches(person);
        }
        table
    }
}

/// Canonical identity merged from one or more aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub id: PersonId,
    pub display_name: String,
    /// Observed names in observation order
    pub names: Vec<String>,
    /// Observed emails in observation order
    pub emails: Vec<String>,
    /// True when an exclusion pattern matches
    pub filter_matched: bool,
}

impl Person {
    pub fn names_str(&self) -> String {
        self.names.join(" | ")
    }

    pub fn emails_str(&self) -> String {
        self.emails.join(" | ")
    }
}

/// Compiled author and email exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct ExclusionPatterns {
    authors: Vec<Pattern>,
    emails: Vec<Pattern>,
}

const CASE_INSENSITIVE: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

impl ExclusionPatterns {
    pub fn new(authors: &[String], emails: &[String]) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<Pattern>> {
            patterns
                .iter()
                .map(|p| Pattern::new(p).map_err(Into::into))
                .collect()
        };
        Ok(Self {
            authors: compile(authors)?,
            emails: compile(emails)?,
        })
    }

    pub fn matches(&self, person: &Person) -> bool {
        let name_hit = person.names.iter().any(|name| {
            self.authors
                .iter()
                .any(|p| p.matches_with(name, CASE_INSENSITIVE))
        });
        name_hit
            || person.emails.iter().any(|email| {
                self.emails
                    .iter()
                    .any(|p| p.matches_with(email, CASE_INSENSITIVE))
            })
    }
}

/// Frozen identity state used by aggregation and row building.
#[derive(Debug, Clone, Default)]
pub struct PersonTable {
    canonical: Vec<PersonId>,
    persons: BTreeMap<PersonId, Person>,
}

impl PersonTable {
    /// Canonical handle of an alias. Aliases registered after the snapshot
    /// resolve to themselves.
    pub fn resolve(&self, id: PersonId) -> PersonId {
        self.canonical.get(id.index()).copied().unwrap_or(id)
    }

    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.persons.get(&self.resolve(id))
    }

    pub fn is_excluded(&self, id: PersonId) -> bool {
        self.person(id).is_some_and(|p| p.filter_matched)
    }

    /// Canonical persons not matched by any exclusion pattern
    pub fn authors_included(&self) -> impl Iterator<Item = &Person> {
        self.persons.values().filter(|p| !p.filter_matched)
    }

    /// Canonical persons matched by an exclusion pattern
    pub fn authors_excluded(&self) -> impl Iterator<Item = &Person> {
        self.persons.values().filter(|p| p.filter_matched)
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }
}
