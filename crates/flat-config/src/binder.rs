//! The binding engine: populates a config instance from a flat property map.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Mutex,
};

use crate::{
    BindConfig, PropertyMap,
    defaults::ConfigDefaults,
    problems::{ConfigError, Message, Problems},
};

/// Engine-wide record of the properties consulted and consumed by builds.
///
/// A property is *seen* iff some binding's prefixed operative name matches it
/// syntactically; it is *used* iff coercion of its value was attempted. Inserts are
/// idempotent, so concurrent builds over the same type keep both sets consistent.
#[derive(Debug, Default)]
pub(crate) struct PropertyTracker {
    seen: Mutex<BTreeSet<String>>,
    used: Mutex<BTreeMap<String, bool>>,
}

impl PropertyTracker {
    fn note_seen(&self, name: String) {
        self.seen.lock().unwrap().insert(name);
    }

    fn note_used(&self, name: String, security_sensitive: bool) {
        let mut used = self.used.lock().unwrap();
        let sensitive = used.entry(name).or_insert(security_sensitive);
        *sensitive |= security_sensitive;
    }

    pub(crate) fn seen(&self) -> BTreeSet<String> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn used(&self) -> BTreeMap<String, bool> {
        self.used.lock().unwrap().clone()
    }
}

/// Builds an instance of `T` from `properties`, applying `defaults` first.
///
/// Errors accumulate and are thrown only at phase boundaries: after metadata problems are
/// merged, after attribute binding plus defunct checks, and after constraint validation.
/// The returned [`Problems`] may still carry warnings for a successful build.
pub(crate) fn bind<T: BindConfig>(
    properties: &PropertyMap,
    prefix: Option<&str>,
    defaults: &[ConfigDefaults],
    tracker: &PropertyTracker,
) -> Result<(T, Problems), ConfigError> {
    let metadata = T::describe_config();
    let _span = tracing::debug_span!(
        "bind_config",
        config = metadata.ty().name_in_code(),
        prefix = prefix.unwrap_or_default(),
    )
    .entered();

    let mut problems = Problems::default();
    problems.record(metadata.problems());
    problems.throw_if_has_errors()?;

    let prefix = match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}."),
        _ => String::new(),
    };

    let mut instance = T::default();
    for holder in defaults {
        holder.apply(&mut instance);
    }

    let class = metadata.ty().name_in_code();
    for (index, attribute) in metadata.attributes().iter().enumerate() {
        let operative = attribute
            .operative
            .map(|name| format!("{prefix}{name}"));
        if let Some(operative) = &operative {
            tracker.note_seen(operative.clone());
        }

        // Resolve the value-supplying property. The operative name wins outright; failing
        // that, the first legacy alias in declared order wins and any further
        // value-supplying alias is a hard conflict.
        let mut chosen: Option<String> = None;
        let mut chosen_is_legacy = false;
        let mut value: Option<&str> = None;
        if let Some(operative) = &operative {
            value = properties.get(operative.as_str()).map(String::as_str);
            if value.is_some() {
                chosen = Some(operative.clone());
            }
        }
        for &legacy in attribute.legacy {
            let legacy = format!("{prefix}{legacy}");
            let Some(legacy_value) = properties.get(&legacy).map(String::as_str) else {
                continue;
            };
            match &operative {
                Some(operative) => problems.add_warning(format!(
                    "Configuration property '{legacy}' has been replaced. Use '{operative}' instead."
                )),
                None => problems.add_warning(format!(
                    "Configuration property '{legacy}' has been deprecated."
                )),
            }
            if value.is_none() {
                value = Some(legacy_value);
                chosen = Some(legacy);
                chosen_is_legacy = true;
            } else if chosen_is_legacy {
                let conflicting = chosen.as_deref().unwrap_or_default();
                problems.add_error(format!(
                    "Configuration property '{legacy}' conflicts with property '{conflicting}'"
                ));
            }
        }

        let (Some(value), Some(chosen)) = (value, chosen) else {
            // No input for this attribute; whatever the defaults produced stays intact.
            continue;
        };

        if let Some(deprecation) = attribute.deprecation {
            let mut warning = format!("Configuration property '{chosen}' is deprecated");
            if let Some(since) = deprecation.since {
                warning.push_str(&format!(" since {since}"));
            }
            if deprecation.for_removal {
                warning.push_str(" and will be removed in a future release");
            }
            problems.add_warning(warning);
        }

        tracker.note_used(chosen.clone(), attribute.security_sensitive);

        if let Err(err) = instance.bind_attribute(index, value) {
            let shown = if attribute.security_sensitive {
                "[REDACTED]"
            } else {
                value
            };
            tracing::info!(property = chosen.as_str(), "coercion failed: {err}");
            let text = format!(
                "Invalid value '{shown}' for type {ty} (property '{chosen}')",
                ty = attribute.rust_type.name_in_code(),
            );
            let cause = if attribute.security_sensitive {
                None
            } else {
                err.detail().map(str::to_owned)
            };
            problems.push_error(match cause {
                Some(cause) => Message::with_cause(text, cause),
                None => Message::new(text),
            });
        } else {
            tracing::trace!(property = chosen.as_str(), "bound attribute");
        }
    }

    for &defunct in metadata.defunct_properties() {
        if defunct.is_empty() {
            continue;
        }
        let defunct = format!("{prefix}{defunct}");
        if properties.contains_key(&defunct) {
            problems.add_error(format!(
                "Defunct property '{defunct}' (class [{class}]) cannot be configured."
            ));
        }
    }
    problems.throw_if_has_errors()?;

    let mut violations = Vec::new();
    instance.collect_violations(&mut violations);
    for violation in &violations {
        let attribute = violation.field().and_then(|field| metadata.attribute(field));
        let (property, location) = match (attribute, violation.field()) {
            (Some(attribute), Some(field)) if attribute.operative.is_some() => {
                let operative = attribute.operative.unwrap_or_default();
                (format!("{prefix}{operative}"), format!("{class}.{field}"))
            }
            (_, Some(field)) => (format!("{prefix}{field}"), format!("{class}.{field}")),
            (_, None) => (format!("{prefix}{class}"), class.to_owned()),
        };
        problems.add_error(format!(
            "Invalid configuration property {property}: {message} (for class {location})",
            message = violation.message(),
        ));
    }
    problems.throw_if_has_errors()?;

    Ok((instance, problems))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use secrecy::ExposeSecret;

    use crate::{
        testing,
        testonly::{
            AmbiguousConfig, LimitsConfig, LogLevel, RetiringConfig, SecretConfig, ServerConfig,
        },
    };

    #[test]
    fn binding_operative_property() {
        let (config, problems) =
            testing::bind_full::<ServerConfig, _, _>(None, [("http.port", "8080")]).unwrap();
        assert_eq!(config.http_port, 8080);
        assert!(problems.warnings().is_empty());
    }

    #[test]
    fn binding_with_prefix() {
        let config: ServerConfig =
            testing::bind_prefixed("server", [("server.http.port", "9090")]).unwrap();
        assert_eq!(config.http_port, 9090);
    }

    #[test]
    fn unset_attributes_are_skipped() {
        let empty: [(&str, &str); 0] = [];
        let (config, problems) = testing::bind_full::<ServerConfig, _, _>(None, empty).unwrap();
        assert_eq!(config.http_port, 0);
        assert_eq!(config.level, None);
        assert!(config.items.is_empty());
        assert!(problems.warnings().is_empty());
    }

    #[test]
    fn legacy_alias_resolves_with_warning() {
        let (config, problems) =
            testing::bind_full::<ServerConfig, _, _>(None, [("server.http-port", "8080")])
                .unwrap();
        assert_eq!(config.http_port, 8080);
        let warnings = problems.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].text(),
            "Configuration property 'server.http-port' has been replaced. \
             Use 'http.port' instead."
        );
    }

    #[test]
    fn operative_value_wins_over_legacy_values() {
        let (config, problems) = testing::bind_full::<ServerConfig, _, _>(
            None,
            [
                ("http.port", "8080"),
                ("server.http-port", "9090"),
                ("legacy.http", "7070"),
            ],
        )
        .unwrap();
        assert_eq!(config.http_port, 8080);
        // One warning per supplied legacy alias; no conflicts since the operative wins.
        assert_eq!(problems.warnings().len(), 2);
        assert!(problems.errors().is_empty());
    }

    #[test]
    fn conflicting_legacy_values_fail() {
        let err = testing::bind_full::<ServerConfig, _, _>(
            None,
            [("server.http-port", "8080"), ("legacy.http", "9090")],
        )
        .unwrap_err();
        assert_eq!(err.messages().len(), 1);
        assert_eq!(
            err.messages()[0].text(),
            "Configuration property 'legacy.http' conflicts with property 'server.http-port'"
        );
    }

    #[test]
    fn fuzzy_enum_matching() {
        for raw in ["warn", "Warn", "WARN"] {
            let config: ServerConfig = testing::bind([("log.level", raw)]).unwrap();
            assert_eq!(config.level, Some(LogLevel::Warn), "raw: {raw:?}");
        }
        for raw in ["trace-all", "trace_all", "TRACE_ALL"] {
            let config: ServerConfig = testing::bind([("log.level", raw)]).unwrap();
            assert_eq!(config.level, Some(LogLevel::TraceAll), "raw: {raw:?}");
        }

        let err = testing::bind::<ServerConfig, _, _>([("log.level", "loud")]).unwrap_err();
        let message = &err.messages()[0];
        assert_eq!(
            message.text(),
            "Invalid value 'loud' for type Option<LogLevel> (property 'log.level')"
        );
        assert_eq!(message.cause(), Some("expected one of: info, warn, error, trace_all"));
    }

    #[test]
    fn list_values_are_split() {
        let config: ServerConfig = testing::bind([("items", "a, b ,,c")]).unwrap();
        assert_eq!(config.items, ["a", "b", "c"]);
    }

    #[test]
    fn defunct_property_fails_the_build() {
        let err = testing::bind::<ServerConfig, _, _>([
            ("http.port", "8080"),
            ("http.threads", "16"),
        ])
        .unwrap_err();
        assert_eq!(err.messages().len(), 1);
        assert_eq!(
            err.messages()[0].text(),
            "Defunct property 'http.threads' (class [ServerConfig]) cannot be configured."
        );
    }

    #[test]
    fn defunct_check_respects_prefix() {
        let err = testing::bind_prefixed::<ServerConfig, _, _>(
            "server",
            [("server.http.threads", "16")],
        )
        .unwrap_err();
        assert!(
            err.messages()[0]
                .text()
                .contains("Defunct property 'server.http.threads'")
        );
        // The unprefixed name belongs to someone else entirely.
        let config: ServerConfig =
            testing::bind_prefixed("server", [("http.threads", "16")]).unwrap();
        assert_eq!(config.http_port, 0);
    }

    #[test]
    fn secret_values_are_redacted_in_diagnostics() {
        let err = testing::bind::<SecretConfig, _, _>([("api.key", "hunter2")]).unwrap_err();
        let message = &err.messages()[0];
        assert_eq!(
            message.text(),
            "Invalid value '[REDACTED]' for type Option<u64> (property 'api.key')"
        );
        assert!(!message.to_string().contains("hunter2"));
        assert_eq!(message.cause(), None);
    }

    #[test]
    fn secret_strings_bind_successfully() {
        let config: SecretConfig = testing::bind([("password", "hunter2")]).unwrap();
        assert_eq!(config.password.unwrap().expose_secret(), "hunter2");
    }

    #[test]
    fn deprecated_attribute_warns() {
        let (config, problems) =
            testing::bind_full::<RetiringConfig, _, _>(None, [("task.threads", "4")]).unwrap();
        assert_eq!(config.threads, Some(4));
        assert_eq!(problems.warnings().len(), 1);
        assert_eq!(
            problems.warnings()[0].text(),
            "Configuration property 'task.threads' is deprecated since 0.9 and will be \
             removed in a future release"
        );
    }

    #[test]
    fn legacy_only_attribute_warns_as_deprecated() {
        let (config, problems) =
            testing::bind_full::<RetiringConfig, _, _>(None, [("old.pool.size", "10")]).unwrap();
        assert_eq!(config.pool_size, Some(10));
        assert_eq!(problems.warnings().len(), 1);
        assert_eq!(
            problems.warnings()[0].text(),
            "Configuration property 'old.pool.size' has been deprecated."
        );
    }

    #[test]
    fn invalid_value_reports_property_and_type() {
        let err = testing::bind::<ServerConfig, _, _>([("http.port", "eighty")]).unwrap_err();
        let message = &err.messages()[0];
        assert_eq!(
            message.text(),
            "Invalid value 'eighty' for type u16 (property 'http.port')"
        );
        assert!(message.cause().is_some());
    }

    #[test]
    fn attribute_validation_reports_operative_name() {
        let err =
            testing::bind::<LimitsConfig, _, _>([("http.port", "0"), ("admin.port", "81")])
                .unwrap_err();
        assert_eq!(err.messages().len(), 1);
        assert_eq!(
            err.messages()[0].text(),
            "Invalid configuration property http.port: value 0 must be in range 1..=65535 \
             (for class LimitsConfig.http_port)"
        );
    }

    #[test]
    fn config_level_validation() {
        let err = testing::bind::<LimitsConfig, _, _>([
            ("http.port", "8080"),
            ("admin.port", "8080"),
        ])
        .unwrap_err();
        assert_eq!(
            err.messages()[0].text(),
            "Invalid configuration property LimitsConfig: ports must be distinct \
             (for class LimitsConfig)"
        );
    }

    #[test]
    fn optional_attribute_validation_skips_absent_values() {
        let config: LimitsConfig = testing::bind([
            ("http.port", "8080"),
            ("admin.port", "8081"),
        ])
        .unwrap();
        assert_eq!(config.app_name, None);

        let err = testing::bind::<LimitsConfig, _, _>([
            ("http.port", "8080"),
            ("admin.port", "8081"),
            ("app.name", ""),
        ])
        .unwrap_err();
        assert!(err.messages()[0].text().contains("must not be empty"));
    }

    #[test]
    fn all_violations_are_reported_together() {
        let err =
            testing::bind::<LimitsConfig, _, _>([("http.port", "0"), ("admin.port", "0")])
                .unwrap_err();
        // Two range violations plus the whole-config constraint.
        assert_eq!(err.messages().len(), 3);
    }

    #[test]
    fn structural_metadata_problems_fail_every_build() {
        let err = testing::bind::<AmbiguousConfig, _, _>([("dup.name", "x")]).unwrap_err();
        assert_matches!(
            err.messages(),
            [message] if message.text().contains("Ambiguous property 'dup.name'")
        );
    }
}
