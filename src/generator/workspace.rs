//! The top-level workspace makefile.
//!
//! Each package gets a phony target that recurses into its own makefile.
//! Targets depend on the sibling packages they link against, so `make -j`
//! at the project root builds in a valid order.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::core::manifest::MANIFEST_NAME;
use crate::core::platform::PlatformContext;
use crate::core::project::{Package, Project};

/// Names of sibling packages `package` links against, first mention wins.
pub fn sibling_dependencies<'a>(project: &'a Project, package: &'a Package) -> Vec<&'a str> {
    let mut deps: Vec<&str> = Vec::new();
    for link in &package.links {
        if let Some(sibling) = project.package(&link.name) {
            if sibling.name != package.name && !deps.contains(&sibling.name.as_str()) {
                deps.push(&sibling.name);
            }
        }
    }
    deps
}

/// Package indices with every package after the siblings it links against.
///
/// Ties are broken by declaration order. When the link graph has a cycle
/// the declaration order is returned unchanged.
pub fn build_order(project: &Project) -> Vec<usize> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..project.packages.len())
        .map(|i| graph.add_node(i))
        .collect();

    // Edge dep -> dependent
    for (i, package) in project.packages.iter().enumerate() {
        for dep in sibling_dependencies(project, package) {
            if let Some(j) = project.package_index(dep) {
                graph.update_edge(nodes[j], nodes[i], ());
            }
        }
    }

    // Kahn's algorithm by hand: `petgraph::algo::toposort` gives no control
    // over ties, and independent packages must keep declaration order.
    let mut in_degree: Vec<usize> = nodes
        .iter()
        .map(|&n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut done = vec![false; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());

    while order.len() < nodes.len() {
        let Some(next) = (0..nodes.len()).find(|&i| !done[i] && in_degree[i] == 0) else {
            let cycle: Vec<&str> = (0..nodes.len())
                .filter(|&i| !done[i])
                .map(|i| project.packages[i].name.as_str())
                .collect();
            tracing::warn!(
                "link cycle between packages {}; using declaration order",
                cycle.join(", ")
            );
            return (0..nodes.len()).collect();
        };

        done[next] = true;
        order.push(next);
        for dependent in graph.neighbors_directed(nodes[next], Direction::Outgoing) {
            let index = graph[dependent];
            in_degree[index] -= 1;
        }
    }

    order
}

/// Render the workspace makefile.
pub fn render_workspace(project: &Project, platform: &PlatformContext) -> String {
    let quiet = platform.quiet_prefix();
    let order = build_order(project);
    let mut text = String::new();

    text.push_str(&format!(
        "# Workspace Makefile for {} autogenerated by makegen\n",
        project.name
    ));
    text.push_str(&format!(
        "# Don't edit this file! Instead edit `{}` then rerun `makegen generate`\n\n",
        MANIFEST_NAME
    ));

    if let Some(first) = project.configurations.first() {
        text.push_str(&format!("ifndef CONFIG\n  CONFIG={}\nendif\n", first));
    }
    text.push_str("export CONFIG\n\n");

    let names: Vec<&str> = project.packages.iter().map(|p| p.name.as_str()).collect();
    text.push_str(&format!("{}\n\n", target_line(".PHONY: all clean", &names)));

    let ordered: Vec<&str> = order
        .iter()
        .map(|&i| project.packages[i].name.as_str())
        .collect();
    text.push_str(&format!("{}\n\n", target_line("all:", &ordered)));

    text.push_str(&format!("Makefile: {}\n", MANIFEST_NAME));
    text.push_str(&format!(
        "\t{}makegen generate --os {} --cc {}{}\n\n",
        quiet,
        platform.os,
        platform.compiler,
        if platform.verbose { " --verbose-makefiles" } else { "" }
    ));

    for package in &project.packages {
        let deps = sibling_dependencies(project, package);
        text.push_str(&format!(
            "{}\n",
            target_line(&format!("{}:", package.name), &deps)
        ));
        if !platform.verbose {
            text.push_str(&format!("\t@echo ==== Building {} ====\n", package.name));
        }
        text.push_str(&format!("\t{}{}\n\n", quiet, sub_make(project, package)));
    }

    text.push_str("clean:\n");
    for package in &project.packages {
        text.push_str(&format!("\t{}{} clean\n", quiet, sub_make(project, package)));
    }
    text.push('\n');
    text
}

fn target_line(head: &str, items: &[&str]) -> String {
    let mut line = head.to_string();
    for item in items {
        line.push(' ');
        line.push_str(item);
    }
    line
}

fn sub_make(project: &Project, package: &Package) -> String {
    format!(
        "$(MAKE) --no-print-directory -C {} -f {}",
        package.path,
        project.makefile_name(package)
    )
}
