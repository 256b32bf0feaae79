//! ASCII tree rendering for inventory group hierarchies.

use std::collections::HashSet;

use crate::models::{InventoryModel, ALL_GROUP};

const GROUP_MARK: char = '@';

/// Render the group tree rooted at `all`, with hosts as leaves.
///
/// A group reached a second time is printed with a trailing `...` and its
/// subtree is not repeated.
///
/// Example output:
/// ```text
/// @all
/// ├── @db
/// │   └── db01
/// ├── @web
/// │   ├── web01
/// │   └── web02
/// └── bastion
/// ```
pub fn render_graph(model: &InventoryModel) -> String {
    let mut output = String::new();
    if model.group(ALL_GROUP).is_none() {
        return output;
    }

    let mut seen = HashSet::new();
    // Explicit stack so deep group chains cannot exhaust the call stack.
    let mut stack = vec![Line::Group {
        name: ALL_GROUP,
        prefix: String::new(),
        is_last: true,
        is_root: true,
    }];

    while let Some(line) = stack.pop() {
        match line {
            Line::Host { name, prefix, is_last } => {
                push_branch(&mut output, &prefix, is_last);
                output.push_str(name);
                output.push('\n');
            }
            Line::Group {
                name,
                prefix,
                is_last,
                is_root,
            } => {
                if !is_root {
                    push_branch(&mut output, &prefix, is_last);
                }
                output.push(GROUP_MARK);
                output.push_str(name);

                let Some(group) = model.group(name) else {
                    output.push('\n');
                    continue;
                };
                if !seen.insert(name) {
                    output.push_str(" ...\n");
                    continue;
                }
                output.push('\n');

                let child_prefix = if is_root {
                    String::new()
                } else {
                    let continuation = if is_last { "    " } else { "│   " };
                    format!("{}{}", prefix, continuation)
                };

                // Child groups first, then direct hosts; pushed in reverse
                // so they pop in display order.
                let total = group.children.len() + group.hosts.len();
                let children = group.children.iter().map(|child| (child.as_str(), true));
                let hosts = group.hosts.iter().map(|host| (host.as_str(), false));
                let entries: Vec<(&str, bool)> = children.chain(hosts).collect();
                for (index, (entry, is_group)) in entries.into_iter().enumerate().rev() {
                    let is_last = index + 1 == total;
                    let prefix = child_prefix.clone();
                    stack.push(if is_group {
                        Line::Group {
                            name: entry,
                            prefix,
                            is_last,
                            is_root: false,
                        }
                    } else {
                        Line::Host {
                            name: entry,
                            prefix,
                            is_last,
                        }
                    });
                }
            }
        }
    }
    output
}

/// One pending line of the tree.
enum Line<'a> {
    Group {
        name: &'a str,
        prefix: String,
        is_last: bool,
        is_root: bool,
    },
    Host {
        name: &'a str,
        prefix: String,
        is_last: bool,
    },
}

fn push_branch(output: &mut String, prefix: &str, is_last: bool) {
    output.push_str(prefix);
    output.push_str(if is_last { "└── " } else { "├── " });
}
