// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of flow definitions.
//!
//! Runs before any actor is built and reports every problem at once:
//!
//! 1. **Names** - every actor has a non-empty name made of
//!    `[A-Za-z0-9_\-:. ]`
//! 2. **Sibling uniqueness** - children of one parent have distinct names,
//!    so every actor has a unique dotted path
//! 3. **Classes** - every class id is known to the [`ActorFactory`]
//!
//! Option values are not checked here; each actor validates its own options
//! during setup, once variables are known.
//!
//! ```rust
//! use actorflow::actors::ActorFactory;
//! use actorflow::config::{validate_flow_config, FlowConfig};
//! use actorflow::errors::ValidationError;
//!
//! let config = FlowConfig::from_yaml(
//!     "name: demo\nactors:\n  - { name: a, class: pass_through }\n  - { name: a, class: warp }\n",
//! )
//! .unwrap();
//!
//! let errors = validate_flow_config(&config, &ActorFactory::with_builtins()).unwrap_err();
//! assert!(errors.contains(&ValidationError::UnknownClass {
//!     path: "demo.a".to_string(),
//!     class: "warp".to_string(),
//! }));
//! assert_eq!(errors.len(), 2);
//! ```

use std::collections::HashSet;

use crate::actors::ActorFactory;
use crate::config::{ActorConfig, FlowConfig};
use crate::errors::ValidationError;
use crate::observability::messages::validation::FlowValidationFailed;
use crate::observability::messages::StructuredLog;

/// Validates the actor tree of `config` against the classes of `factory`.
///
/// # Returns
///
/// * `Ok(())` - the definition can be built
/// * `Err(Vec<ValidationError>)` - every structural problem found
pub fn validate_flow_config(
    config: &FlowConfig,
    factory: &ActorFactory,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    validate_siblings(&config.actors, &config.name, factory, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        FlowValidationFailed {
            flow_name: &config.name,
            error_count: errors.len(),
        }
        .log();
        Err(errors)
    }
}

fn validate_siblings(
    actors: &[ActorConfig],
    parent: &str,
    factory: &ActorFactory,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for actor in actors {
        if actor.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName {
                parent: parent.to_string(),
            });
        } else if !is_valid_name(&actor.name) {
            errors.push(ValidationError::InvalidName {
                parent: parent.to_string(),
                name: actor.name.clone(),
            });
        } else if !seen.insert(actor.name.as_str()) {
            errors.push(ValidationError::DuplicateSiblingName {
                parent: parent.to_string(),
                name: actor.name.clone(),
            });
        }

        let path = format!("{}.{}", parent, actor.name.replace('.', "\\."));
        if !factory.is_class_available(&actor.class) {
            errors.push(ValidationError::UnknownClass {
                path: path.clone(),
                class: actor.class.clone(),
            });
        }
        validate_siblings(&actor.children, &path, factory, errors);
    }
}

fn is_valid_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.' | ' '))
}
