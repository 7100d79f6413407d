//! Variable environment and target resolution

use crate::action::{Point, Target};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named points available during a run. Each run owns its own copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(BTreeMap<String, Point>);

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, point: Point) -> Option<Point> {
        self.0.insert(name.into(), point)
    }

    pub fn with(mut self, name: impl Into<String>, point: Point) -> Self {
        self.bind(name, point);
        self
    }

    pub fn get(&self, name: &str) -> Option<Point> {
        self.0.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve a target to a concrete point. Literal points never look at the environment.
    pub fn resolve(&self, target: &Target) -> Result<Point> {
        match target {
            Target::Point(p) => Ok(*p),
            Target::Var { var } => self
                .get(var)
                .ok_or_else(|| Error::unbound_variable(var, self.names())),
        }
    }
}

impl FromIterator<(String, Point)> for Variables {
    fn from_iter<I: IntoIterator<Item = (String, Point)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn literal_resolves_to_itself() {
        let vars = Variables::new();
        let p = Point::new(3.0, 4.0);
        assert_eq!(vars.resolve(&Target::Point(p)).unwrap(), p);
    }

    #[test]
    fn var_lookup_is_exact() {
        let vars = Variables::new().with("p1", Point::new(1.0, 1.0));
        assert_eq!(vars.resolve(&Target::var("p1")).unwrap(), Point::new(1.0, 1.0));

        let err = vars.resolve(&Target::var("P1")).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnboundVariable);
        assert_eq!(err.context.unwrap()["var"], "P1");
    }

    #[test]
    fn parses_from_json_object() {
        let vars: Variables =
            serde_json::from_str(r#"{"save": {"x": 100, "y": 200.5}}"#).unwrap();
        assert_eq!(vars.get("save"), Some(Point::new(100.0, 200.5)));
    }
}
