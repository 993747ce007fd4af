use super::*;

impl CallGraph {
    fn node_name(node: &NodeId) -> String {
        format!("\"{}:{}\"", node.script.replace('"', "'"), node.chunk)
    }

    /// Graphviz rendering: edges first, then one cluster per script file.
    ///
    /// Endpoints without a recorded chunk are drawn in a red cluster of
    /// their own so that jumps into unparsed files stay visible.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph main {\n");

        for (src, dst) in &self.edges {
            dot.push_str(&format!(
                "    {} -> {};\n",
                Self::node_name(src),
                Self::node_name(dst)
            ));
        }

        let mut synthesized: BTreeMap<&str, BTreeSet<&NodeId>> = BTreeMap::new();
        for (src, dst) in &self.edges {
            for node in [src, dst] {
                if !self.nodes.contains(node) {
                    synthesized.entry(node.script.as_str()).or_default().insert(node);
                }
            }
        }

        for (script, nodes) in self.by_script() {
            dot.push_str(&format!("    subgraph \"cluster_{}\" {{\n", script.replace('"', "'")));
            dot.push_str(&format!("        label=\"{}\";\n", script.replace('"', "'")));
            dot.push_str("        style=filled;\n");
            dot.push_str("        color=lightgrey;\n");
            for node in nodes {
                dot.push_str(&format!(
                    "        {} [label=\"es{}\"];\n",
                    Self::node_name(node),
                    node.chunk
                ));
            }
            if let Some(extra) = synthesized.remove(script) {
                for node in extra {
                    dot.push_str(&format!(
                        "        {} [label=\"es{}?\" color=red];\n",
                        Self::node_name(node),
                        node.chunk
                    ));
                }
            }
            dot.push_str("    }\n");
        }

        for (script, nodes) in synthesized {
            dot.push_str(&format!(
                "    subgraph \"cluster_{}\" {{\n",
                script.replace('"', "'")
            ));
            dot.push_str(&format!("        label=\"{}\";\n", script.replace('"', "'")));
            dot.push_str("        color=red;\n");
            for node in nodes {
                dot.push_str(&format!(
                    "        {} [label=\"es{}?\" color=red];\n",
                    Self::node_name(node),
                    node.chunk
                ));
            }
            dot.push_str("    }\n");
        }

        dot.push_str("}\n");
        dot
    }
}
