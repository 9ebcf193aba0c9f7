use crate::models::Config;

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    /// Emit every warning through `tracing`.
    pub fn log(&self) {
        for warning in &self.items {
            match &warning.hint {
                Some(hint) => tracing::warn!(hint = %hint, "{}", warning.message),
                None => tracing::warn!("{}", warning.message),
            }
        }
    }
}

/// Non-fatal sanity checks on a composed configuration.
pub fn collect_warnings(config: &Config) -> ConfigWarnings {
    let mut warnings = ConfigWarnings::default();

    if config.database.url.is_none() {
        warnings.push_with_hint(
            "DATABASE_URL not configured; projects and audits are kept in memory only",
            "Set DATABASE_URL or add a [database] section to auditr.toml",
        );
    }

    if config.cors.is_wildcard_included() {
        warnings.push("CORS allows any origin");
    }

    if config.checker.rule_tags.is_empty() {
        warnings.push_with_hint(
            "No accessibility rule tags configured; every axe rule will run",
            "Set AXE_RULE_TAGS or checker.rule_tags",
        );
    }

    let audit = &config.audit;
    if audit.settle_quiet_window >= audit.click_settle_ceiling {
        warnings.push(
            "audit.settle_quiet_window is not shorter than click_settle_ceiling; click settle waits always hit the ceiling",
        );
    }

    warnings
}
