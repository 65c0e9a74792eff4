use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::error::{PathError, Result};

/// An absolute path into the composed scene graph.
///
/// A path is either the absolute root `/` or a `/`-separated sequence of
/// identifier-like component names (`[A-Za-z_][A-Za-z0-9_]*`). Paths are
/// backed by [`smol_str::SmolStr`], so cloning is cheap and short paths
/// avoid heap allocation entirely.
///
/// `Ord` compares paths component-wise, which gives **prefix locality**:
/// in any ordered collection, the paths under a subtree root form one
/// contiguous range starting at the root itself. Because `/` sorts below
/// every byte a component may contain, byte-wise comparison of the textual
/// form realizes exactly that order, so the derived impl is correct.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ScenePath(SmolStr);

impl ScenePath {
    /// The absolute root `/`.
    pub fn absolute_root() -> Self {
        Self(SmolStr::new_static("/"))
    }

    /// Parse an absolute path from its textual form.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(PathError::Empty);
        }
        if !text.starts_with('/') {
            return Err(PathError::NotAbsolute {
                text: text.to_string(),
            });
        }
        if text == "/" {
            return Ok(Self::absolute_root());
        }
        for component in text[1..].split('/') {
            if component.is_empty() {
                return Err(PathError::EmptyComponent {
                    text: text.to_string(),
                });
            }
            validate_component(component)?;
        }
        Ok(Self(SmolStr::new(text)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    pub fn is_absolute_root(&self) -> bool {
        self.0 == "/"
    }

    /// True when the path names a prim directly under the absolute root.
    pub fn is_root_prim(&self) -> bool {
        !self.is_absolute_root() && !self.0[1..].contains('/')
    }

    /// The root-prim ancestor of this path, or `None` for the absolute
    /// root itself.
    pub fn root_prim(&self) -> Option<ScenePath> {
        if self.is_absolute_root() {
            return None;
        }
        match self.0[1..].find('/') {
            Some(idx) => Some(Self(SmolStr::new(&self.0[..idx + 1]))),
            None => Some(self.clone()),
        }
    }

    /// The final component name; empty for the absolute root.
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) if !self.is_absolute_root() => &self.0[idx + 1..],
            _ => "",
        }
    }

    /// The parent path, or `None` for the absolute root.
    pub fn parent(&self) -> Option<ScenePath> {
        if self.is_absolute_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::absolute_root()),
            Some(idx) => Some(Self(SmolStr::new(&self.0[..idx]))),
            None => None,
        }
    }

    /// Append one component name.
    pub fn append_child(&self, name: &str) -> Result<ScenePath> {
        if name.is_empty() {
            return Err(PathError::EmptyComponent {
                text: name.to_string(),
            });
        }
        validate_component(name)?;
        let text = if self.is_absolute_root() {
            format!("/{name}")
        } else {
            format!("{}/{name}", self.0)
        };
        Ok(Self(SmolStr::new(text)))
    }

    /// True when `prefix` is this path or one of its ancestors. Every
    /// absolute path has the absolute root as a prefix.
    pub fn has_prefix(&self, prefix: &ScenePath) -> bool {
        if prefix.is_absolute_root() {
            return true;
        }
        if self.0.len() == prefix.0.len() {
            return self.0 == prefix.0;
        }
        self.0.len() > prefix.0.len()
            && self.0.starts_with(prefix.0.as_str())
            && self.0.as_bytes()[prefix.0.len()] == b'/'
    }

    /// Rewrite the leading `old` prefix of this path to `new`. Returns
    /// `None` when `old` is not a prefix of this path.
    pub fn replace_prefix(&self, old: &ScenePath, new: &ScenePath) -> Option<ScenePath> {
        if !self.has_prefix(old) {
            return None;
        }
        if self.0.len() == old.0.len() {
            return Some(new.clone());
        }
        let suffix = if old.is_absolute_root() {
            self.0.as_str()
        } else {
            &self.0[old.0.len()..]
        };
        if new.is_absolute_root() {
            Some(Self(SmolStr::new(suffix)))
        } else {
            Some(Self(SmolStr::new(format!("{}{suffix}", new.0))))
        }
    }

    /// Component names from the root down; empty for the absolute root.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0[1..].split('/').filter(|component| !component.is_empty())
    }
}

fn validate_component(component: &str) -> Result<()> {
    let mut chars = component.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(PathError::InvalidComponent {
            component: component.to_string(),
        });
    }
    Ok(())
}

impl fmt::Debug for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScenePath").field(&self.0.as_str()).finish()
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenePath {
    type Err = PathError;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

impl serde::Serialize for ScenePath {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for ScenePath {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> ScenePath {
        ScenePath::parse(text).unwrap()
    }

    #[test]
    fn parse_rejects_malformed_text() {
        assert_eq!(ScenePath::parse(""), Err(PathError::Empty));
        assert_eq!(
            ScenePath::parse("World/Set"),
            Err(PathError::NotAbsolute {
                text: "World/Set".to_string()
            })
        );
        assert_eq!(
            ScenePath::parse("/World//Set"),
            Err(PathError::EmptyComponent {
                text: "/World//Set".to_string()
            })
        );
        assert_eq!(
            ScenePath::parse("/World/"),
            Err(PathError::EmptyComponent {
                text: "/World/".to_string()
            })
        );
        assert_eq!(
            ScenePath::parse("/World/1st"),
            Err(PathError::InvalidComponent {
                component: "1st".to_string()
            })
        );
        assert_eq!(
            ScenePath::parse("/World/a-b"),
            Err(PathError::InvalidComponent {
                component: "a-b".to_string()
            })
        );
    }

    #[test]
    fn root_handling() {
        let root = ScenePath::absolute_root();
        assert_eq!(ScenePath::parse("/").unwrap(), root);
        assert!(root.is_absolute_root());
        assert!(!root.is_root_prim());
        assert_eq!(root.parent(), None);
        assert_eq!(root.root_prim(), None);
        assert_eq!(root.name(), "");
        assert_eq!(root.components().count(), 0);
    }

    #[test]
    fn navigation() {
        let p = path("/World/Set_1/Prop_1");
        assert_eq!(p.name(), "Prop_1");
        assert_eq!(p.parent(), Some(path("/World/Set_1")));
        assert_eq!(p.root_prim(), Some(path("/World")));
        assert!(!p.is_root_prim());
        assert!(path("/World").is_root_prim());
        assert_eq!(path("/World").parent(), Some(ScenePath::absolute_root()));
        assert_eq!(
            p.components().collect::<Vec<_>>(),
            vec!["World", "Set_1", "Prop_1"]
        );
        assert_eq!(
            path("/World/Set_1").append_child("Prop_1").unwrap(),
            p
        );
        assert_eq!(
            ScenePath::absolute_root().append_child("World").unwrap(),
            path("/World")
        );
    }

    #[test]
    fn prefix_tests() {
        let p = path("/World/Set_1/Prop_1");
        assert!(p.has_prefix(&p));
        assert!(p.has_prefix(&path("/World/Set_1")));
        assert!(p.has_prefix(&path("/World")));
        assert!(p.has_prefix(&ScenePath::absolute_root()));
        assert!(!p.has_prefix(&path("/World/Set_2")));
        // A textual prefix that ends mid-component is not a path prefix.
        assert!(!path("/World/Set_12").has_prefix(&path("/World/Set_1")));
    }

    #[test]
    fn prefix_replacement() {
        let p = path("/World/Set_1/Prop_1/Scope");
        assert_eq!(
            p.replace_prefix(&path("/World/Set_1/Prop_1"), &path("/__Master_2")),
            Some(path("/__Master_2/Scope"))
        );
        assert_eq!(
            path("/World/Set_1").replace_prefix(&path("/World/Set_1"), &path("/__Master_1")),
            Some(path("/__Master_1"))
        );
        assert_eq!(
            p.replace_prefix(&ScenePath::absolute_root(), &path("/Shelf")),
            Some(path("/Shelf/World/Set_1/Prop_1/Scope"))
        );
        assert_eq!(
            path("/Shelf/World").replace_prefix(&path("/Shelf"), &ScenePath::absolute_root()),
            Some(path("/World"))
        );
        assert_eq!(p.replace_prefix(&path("/Else"), &path("/X")), None);
    }

    #[test]
    fn ordering_is_component_wise() {
        // `/W/A/B` sits between its parent and the sibling whose name
        // extends `A`, so subtree ranges are contiguous.
        assert!(path("/W/A") < path("/W/A/B"));
        assert!(path("/W/A/B") < path("/W/AB"));
        assert!(path("/W/A") < path("/W/B"));
        assert!(ScenePath::absolute_root() < path("/A"));
    }

    #[test]
    fn serde_round_trip_validates() {
        let p = path("/World/Set_1");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"/World/Set_1\"");
        assert_eq!(serde_json::from_str::<ScenePath>(&json).unwrap(), p);
        assert!(serde_json::from_str::<ScenePath>("\"relative/path\"").is_err());
    }
}
