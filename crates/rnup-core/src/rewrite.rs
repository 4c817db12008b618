/// Name of the template project the upstream diffs are generated from.
pub const TEMPLATE_APP_NAME: &str = "RnDiffApp";
pub const TEMPLATE_PACKAGE: &str = "com.rndiffapp";

const TEMPLATE_PACKAGE_PATH: &str = "com/rndiffapp";
const TEMPLATE_LOWER_NAME: &str = "rndiffapp";

/// Substitutes the template's name and package with the real ones.
///
/// Pure text substitution: the replacement identifiers are not validated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    app_name: String,
    app_package: String,
    package_path: String,
    lower_name: String,
}

impl Placeholders {
    pub fn new(app_name: impl Into<String>, app_package: impl Into<String>) -> Self {
        let app_name = app_name.into();
        let app_package = app_package.into();
        let package_path = app_package.replace('.', "/");
        let lower_name = app_name.to_lowercase();
        Self {
            app_name,
            app_package,
            package_path,
            lower_name,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn app_package(&self) -> &str {
        &self.app_package
    }

    pub fn rewrite(&self, text: &str) -> String {
        // Package forms go first so the bare lowercase token does not eat them.
        text.replace(TEMPLATE_PACKAGE, &self.app_package)
            .replace(TEMPLATE_PACKAGE_PATH, &self.package_path)
            .replace(TEMPLATE_APP_NAME, &self.app_name)
            .replace(TEMPLATE_LOWER_NAME, &self.lower_name)
    }

    pub fn rewrite_all(&self, lines: &[String]) -> Vec<String> {
        lines.iter().map(|line| self.rewrite(line)).collect()
    }
}
