//! Versioned operator resolution.
//!
//! A graph declares, per operator domain, exactly which opset version its
//! nodes were authored against. Backends publish an ordered table of
//! [`ResolveRule`]s; resolution scans that table and commits to the first
//! rule whose op type matches, then requires one of the declared opsets to
//! satisfy the rule's domain and version selector. There is no fallthrough
//! to later rules for the same op type, so a version mismatch on the chosen
//! rule is a hard resolution error.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::Node;
use crate::operator::{Operator, OperatorFactory};

/// One `(domain, version)` pair declared by a model. The empty domain and
/// `"ai.onnx"` name the same default operator set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpSet {
    pub domain: String,
    pub version: i64,
}

impl OpSet {
    pub fn new(domain: impl Into<String>, version: i64) -> OpSet {
        OpSet {
            domain: domain.into(),
            version,
        }
    }
}

/// Which opset versions an implementation covers.
///
/// Parsed from the string forms used in rule tables: `"7"` matches exactly
/// version 7, `"6+"` matches 6 and everything newer, `"1-11"` matches the
/// closed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    Exact(i64),
    AtLeast(i64),
    Range(i64, i64),
}

impl VersionSelector {
    pub fn parse(selector: &str) -> Result<VersionSelector> {
        let malformed =
            || Error::resolution(format!("malformed version selector '{selector}'"));
        if let Some(start) = selector.strip_suffix('+') {
            let start = start.parse().map_err(|_| malformed())?;
            return Ok(VersionSelector::AtLeast(start));
        }
        if let Some((lo, hi)) = selector.split_once('-') {
            let lo: i64 = lo.parse().map_err(|_| malformed())?;
            let hi: i64 = hi.parse().map_err(|_| malformed())?;
            if lo > hi {
                return Err(malformed());
            }
            return Ok(VersionSelector::Range(lo, hi));
        }
        Ok(VersionSelector::Exact(selector.parse().map_err(|_| malformed())?))
    }

    pub fn matches(&self, version: i64) -> bool {
        match *self {
            VersionSelector::Exact(v) => version == v,
            VersionSelector::AtLeast(v) => version >= v,
            VersionSelector::Range(lo, hi) => lo <= version && version <= hi,
        }
    }
}

/// One entry of a backend's resolution table.
#[derive(Clone, Copy)]
pub struct ResolveRule {
    pub op_type: &'static str,
    pub domain: &'static str,
    pub versions: &'static str,
    pub factory: OperatorFactory,
}

impl ResolveRule {
    pub fn new(
        op_type: &'static str,
        domain: &'static str,
        versions: &'static str,
        factory: OperatorFactory,
    ) -> ResolveRule {
        ResolveRule {
            op_type,
            domain,
            versions,
            factory,
        }
    }
}

impl std::fmt::Debug for ResolveRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveRule")
            .field("op_type", &self.op_type)
            .field("domain", &self.domain)
            .field("versions", &self.versions)
            .finish()
    }
}

fn canonical_domain(domain: &str) -> &str {
    if domain == "ai.onnx" {
        ""
    } else {
        domain
    }
}

/// Whether two domain names address the same operator set.
pub fn domains_match(a: &str, b: &str) -> bool {
    canonical_domain(a) == canonical_domain(b)
}

/// Constructs the operator for `node` from the first rule in `rules` whose
/// op type matches, provided one of the graph's declared `opsets` satisfies
/// the rule's domain and version selector. The returned operator has not
/// had its attributes bound yet.
pub fn resolve_operator(
    node: &Node,
    opsets: &[OpSet],
    rules: &[ResolveRule],
) -> Result<Box<dyn Operator>> {
    for rule in rules {
        if node.op_type != rule.op_type {
            continue;
        }
        let selector = VersionSelector::parse(rule.versions)?;
        for opset in opsets {
            if domains_match(&opset.domain, rule.domain) && selector.matches(opset.version) {
                return Ok((rule.factory)());
            }
        }
        return Err(Error::resolution(format!(
            "no opset declared by the model satisfies operator '{}' (implemented for versions {})",
            node.op_type, rule.versions
        )));
    }
    Err(Error::resolution(format!(
        "unrecognized operator '{}'",
        node.op_type
    )))
}
