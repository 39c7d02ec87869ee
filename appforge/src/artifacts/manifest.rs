//! Final bundle assembly and bootstrap files

use std::collections::{BTreeMap, BTreeSet};

use crate::artifacts::sanitize::LOOKUP_FN;
use crate::error::ManifestError;
use crate::types::{ArtifactFailure, Bundle, GeneratedArtifact};

pub const RUNTIME_FILE: &str = "runtime.js";
pub const MANIFEST_FILE: &str = "manifest.js";
pub const ENTRY_FILE: &str = "index.html";

pub struct ManifestBuilder {
    title: String,
    root_name: String,
}

impl ManifestBuilder {
    pub fn new(title: impl Into<String>, root_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            root_name: root_name.into(),
        }
    }

    /// Assemble the bundle.
    ///
    /// Duplicate filenames are rejected, never resolved by overwriting.
    /// Dropped artifacts contribute their issues but no file and no registry entry.
    pub fn build(
        &self,
        artifacts: Vec<GeneratedArtifact>,
        failures: &[ArtifactFailure],
    ) -> Result<Bundle, ManifestError> {
        let mut seen = BTreeSet::new();
        for artifact in &artifacts {
            if !seen.insert(artifact.filename.clone()) {
                return Err(ManifestError::DuplicateFilename(artifact.filename.clone()));
            }
        }

        let registry: BTreeMap<String, String> = artifacts
            .iter()
            .map(|a| (a.name.clone(), a.filename.clone()))
            .collect();

        let mut issues: BTreeMap<String, Vec<_>> = artifacts
            .iter()
            .filter(|a| !a.issues.is_empty())
            .map(|a| (a.filename.clone(), a.issues.clone()))
            .collect();
        for failure in failures {
            issues
                .entry(failure.filename.clone())
                .or_default()
                .extend(failure.issues.iter().cloned());
        }

        let bootstrap = [
            GeneratedArtifact::bootstrap(RUNTIME_FILE, runtime_script()),
            GeneratedArtifact::bootstrap(MANIFEST_FILE, manifest_script(&registry)),
            GeneratedArtifact::bootstrap(ENTRY_FILE, self.entry_document(&artifacts)),
        ];
        for file in &bootstrap {
            if !seen.insert(file.filename.clone()) {
                return Err(ManifestError::DuplicateFilename(file.filename.clone()));
            }
        }

        let mut all: Vec<GeneratedArtifact> = artifacts.into_iter().chain(bootstrap).collect();
        all.sort_by(|a, b| a.filename.cmp(&b.filename));

        Ok(Bundle {
            artifacts: all,
            registry,
            issues,
            entry_document: ENTRY_FILE.to_string(),
            documents: None,
        })
    }

    /// Loads runtime, components, pages, the root container, then the manifest
    fn entry_document(&self, artifacts: &[GeneratedArtifact]) -> String {
        let mut ordered: Vec<&GeneratedArtifact> = artifacts.iter().collect();
        ordered.sort_by(|a, b| {
            (a.kind.load_tier(), &a.filename).cmp(&(b.kind.load_tier(), &b.filename))
        });

        let mut scripts = vec![format!("  <script src=\"{}\"></script>", RUNTIME_FILE)];
        scripts.extend(ordered.iter().map(|a| {
            format!(
                "  <script type=\"text/babel\" data-presets=\"react\" src=\"{}\"></script>",
                a.filename
            )
        }));
        scripts.push(format!(
            "  <script type=\"text/babel\" data-presets=\"react\" src=\"{}\"></script>",
            MANIFEST_FILE
        ));

        format!(
            r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title}</title>
  <script src="https://unpkg.com/react@18/umd/react.development.js"></script>
  <script src="https://unpkg.com/react-dom@18/umd/react-dom.development.js"></script>
  <script src="https://unpkg.com/@babel/standalone/babel.min.js"></script>
</head>
<body>
  <div id="root"></div>
{scripts}
  <script type="text/babel" data-presets="react">
    (function () {{
      const Root = {lookup}("{root}");
      ReactDOM.createRoot(document.getElementById("root")).render(<Root />);
    }})();
  </script>
</body>
</html>
"##,
            title = escape_html(&self.title),
            scripts = scripts.join("\n"),
            lookup = LOOKUP_FN,
            root = self.root_name,
        )
    }
}

/// Lazy lookup with placeholder fallback plus navigation and state mocks
///
/// `resolveComponent` hands out a stable proxy per name and reads
/// `window[name]` only when the proxy renders, so load order between
/// artifacts does not matter.
fn runtime_script() -> String {
    format!(
        r##"(function () {{
  function Placeholder(props) {{
    return React.createElement(
      "div",
      {{ style: {{ padding: "8px", border: "1px dashed #9ca3af", color: "#6b7280" }} }},
      "Component " + props.componentName + " is unavailable"
    );
  }}

  function isComponent(value) {{
    return typeof value === "function" ||
      (!!value && typeof value === "object" && "$$typeof" in value);
  }}

  var proxies = {{}};
  window.{lookup} = function (name) {{
    if (proxies[name]) {{
      return proxies[name];
    }}
    var proxy = function (props) {{
      var found = window[name];
      if (isComponent(found) && found !== proxy) {{
        return React.createElement(found, props);
      }}
      return React.createElement(Placeholder, Object.assign({{ componentName: name }}, props));
    }};
    proxy.displayName = name;
    proxies[name] = proxy;
    return proxy;
  }};

  var listeners = [];
  window.__currentRoute = "home";
  window.navigate = function (route) {{
    window.__currentRoute = route;
    listeners.forEach(function (fn) {{ fn(route); }});
  }};
  window.useNavigate = function () {{
    var state = React.useState(window.__currentRoute);
    React.useEffect(function () {{
      listeners.push(state[1]);
      return function () {{
        listeners = listeners.filter(function (fn) {{ return fn !== state[1]; }});
      }};
    }}, []);
    return {{ route: state[0], navigate: window.navigate }};
  }};

  var store = {{}};
  window.useAppState = function (key, initial) {{
    var state = React.useState(key in store ? store[key] : initial);
    var set = function (value) {{
      store[key] = value;
      state[1](value);
    }};
    return [state[0], set];
  }};
}})();
"##,
        lookup = LOOKUP_FN
    )
}

/// Records which declared symbols actually loaded
fn manifest_script(registry: &BTreeMap<String, String>) -> String {
    let declared = serde_json::to_string(registry).unwrap_or_else(|_| "{}".to_string());
    format!(
        r##"(function () {{
  var declared = {declared};
  var loaded = [];
  var missing = [];
  Object.keys(declared).forEach(function (name) {{
    (typeof window[name] !== "undefined" ? loaded : missing).push(name);
  }});
  window.__APPFORGE_MANIFEST__ = {{ declared: declared, loaded: loaded, missing: missing }};
  if (missing.length > 0) {{
    console.warn("components failed to load:", missing);
  }}
}})();
"##,
        declared = declared
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
