//! Volume and mount translation.
//!
//! Short syntax `source:target[:options]` is classified by its source: a
//! path (absolute, relative, or containing a separator) becomes a bind
//! mount; anything else is an engine-managed named volume, scoped by the
//! stack identifier to avoid cross-stack collisions. Long-form entries are
//! translated per their declared `type`. Tmpfs entries are collected apart
//! from binds since the engine takes them in a different argument
//! (`target:opt1,opt2`).

use std::path::Path;

use stackplan_common::diag::Diagnostics;

use crate::document::Node;

/// Engine-ready mount arguments for one service.
#[derive(Debug, Clone, Default)]
pub struct MountTranslation {
    /// Bind and named-volume mount strings (`source:target[:options]`).
    pub binds: Vec<String>,
    /// Tmpfs mount strings (`target[:options]`).
    pub tmpfs: Vec<String>,
    /// Stack-scoped named volumes the engine must create first.
    pub volumes_to_create: Vec<String>,
    /// Skipped-mount warnings.
    pub diag: Diagnostics,
}

/// Translates a service's volume entries into mount arguments.
///
/// A bind mount whose host source does not exist is skipped with a warning
/// rather than failing the plan.
#[must_use]
pub fn translate_volumes(service: &str, entries: &[Node], stack_id: &str) -> MountTranslation {
    let mut out = MountTranslation::default();
    for entry in entries {
        match entry {
            Node::String(spec) => translate_short(service, spec, stack_id, &mut out),
            Node::Mapping(_) => translate_long(service, entry, stack_id, &mut out),
            other => {
                if let Some(spec) = other.scalar_string() {
                    translate_short(service, &spec, stack_id, &mut out);
                }
            }
        }
    }
    out
}

fn translate_short(service: &str, spec: &str, stack_id: &str, out: &mut MountTranslation) {
    let mut parts = spec.splitn(3, ':');
    let source = parts.next().unwrap_or_default();
    let Some(target) = parts.next() else {
        // Lone path: anonymous volume, created implicitly by the engine.
        tracing::debug!(service, target = spec, "anonymous volume left to the engine");
        return;
    };
    let options = parts.next();

    if is_host_path(source) {
        push_bind(service, source, target, options, out);
    } else {
        let scoped = scope_volume(stack_id, source);
        out.volumes_to_create.push(scoped.clone());
        out.binds.push(join_mount(&scoped, target, options));
    }
}

fn translate_long(service: &str, entry: &Node, stack_id: &str, out: &mut MountTranslation) {
    let mount_type = entry.get("type").and_then(Node::as_str).unwrap_or("volume");
    let Some(target) = entry.get("target").and_then(Node::scalar_string) else {
        out.diag.warning(format!(
            "service \"{service}\" has a volume entry without a 'target'; skipping it"
        ));
        return;
    };
    let read_only = entry.get("read_only").and_then(Node::as_bool) == Some(true);
    let options = read_only.then_some("ro");

    match mount_type {
        "bind" => {
            let Some(source) = entry.get("source").and_then(Node::scalar_string) else {
                out.diag.warning(format!(
                    "service \"{service}\" has a bind mount without a 'source'; skipping it"
                ));
                return;
            };
            push_bind(service, &source, &target, options, out);
        }
        "volume" => {
            match entry.get("source").and_then(Node::scalar_string) {
                Some(source) if !source.is_empty() => {
                    let scoped = scope_volume(stack_id, &source);
                    out.volumes_to_create.push(scoped.clone());
                    out.binds.push(join_mount(&scoped, &target, options));
                }
                _ => {
                    tracing::debug!(service, %target, "anonymous volume left to the engine");
                }
            }
        }
        "tmpfs" => {
            let opts: Vec<String> = entry
                .get("tmpfs")
                .and_then(Node::as_mapping)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|(k, v)| v.scalar_string().map(|v| format!("{k}={v}")))
                        .collect()
                })
                .unwrap_or_default();
            if opts.is_empty() {
                out.tmpfs.push(target);
            } else {
                out.tmpfs.push(format!("{target}:{}", opts.join(",")));
            }
        }
        other => {
            out.diag.warning(format!(
                "service \"{service}\" uses unsupported mount type \"{other}\"; skipping it"
            ));
        }
    }
}

fn push_bind(
    service: &str,
    source: &str,
    target: &str,
    options: Option<&str>,
    out: &mut MountTranslation,
) {
    // One missing bind source never fails the whole plan.
    if !Path::new(source).exists() {
        out.diag.warning(format!(
            "service \"{service}\": bind mount source \"{source}\" does not exist on the host; skipping this mount"
        ));
        return;
    }
    out.binds.push(join_mount(source, target, options));
}

fn join_mount(source: &str, target: &str, options: Option<&str>) -> String {
    options.map_or_else(
        || format!("{source}:{target}"),
        |opts| format!("{source}:{target}:{opts}"),
    )
}

fn scope_volume(stack_id: &str, name: &str) -> String {
    format!("{stack_id}_{name}")
}

fn is_host_path(source: &str) -> bool {
    source.starts_with('/')
        || source.starts_with('.')
        || source.starts_with('~')
        || source.contains('/')
}

/// Extracts the source name of a volume entry when it refers to an
/// engine-managed named volume. Bind-mount paths and anonymous volumes
/// return `None`.
pub(crate) fn named_volume_source(entry: &Node) -> Option<String> {
    let source = match entry {
        Node::String(spec) => {
            let mut parts = spec.splitn(2, ':');
            let head = parts.next().unwrap_or_default().to_owned();
            parts.next()?;
            head
        }
        Node::Mapping(_) => {
            if entry.get("type").and_then(Node::as_str).unwrap_or("volume") != "volume" {
                return None;
            }
            entry.get("source").and_then(Node::scalar_string)?
        }
        _ => return None,
    };
    if source.is_empty() || is_host_path(&source) {
        None
    } else {
        Some(source)
    }
}
