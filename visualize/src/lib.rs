// MIT LICENSE
//
// Copyright (c) 2021 Dash Core Group
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Graphviz DOT export of Merkle trees.
//!
//! Leaves are drawn as ovals feeding the rectangle of their tree node, the
//! leaf level shares one rank, and invisible edges between neighbouring leaf
//! nodes keep them in input order. Labels come from a [`LeafFormatter`] and a
//! [`NodeFormatter`].

use std::fmt::{self, Write};

use itertools::Itertools;
use merkletree_pollard::{HashProvider, MerkleTree, MerkleTreeError};

/// Number of bytes kept at each end by [`TruncatedHexFormatter`].
static TRUNCATED_BYTES: usize = 2;

/// Errors raised while rendering a tree.
#[derive(Debug, thiserror::Error)]
pub enum VisualizeError {
    /// The leaf data supplied does not match the tree.
    #[error("expected {expected} leaves, got {actual}")]
    LeafCountMismatch {
        /// Leaf count of the tree.
        expected: usize,
        /// Number of leaves supplied.
        actual: usize,
    },
    /// Reading a node digest from the tree failed.
    #[error("tree error: {0}")]
    Tree(#[from] MerkleTreeError),
    /// Writing the output failed.
    #[error("format error: {0}")]
    Format(#[from] fmt::Error),
}

/// Label for a leaf's raw data.
pub trait LeafFormatter {
    /// Format the leaf bytes.
    fn format_leaf(&self, data: &[u8]) -> String;
}

/// Label for a node digest.
pub trait NodeFormatter {
    /// Format the digest bytes.
    fn format_node(&self, digest: &[u8]) -> String;
}

/// Leaf data as (lossy) UTF-8 text.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringFormatter;

impl LeafFormatter for StringFormatter {
    fn format_leaf(&self, data: &[u8]) -> String {
        String::from_utf8_lossy(data).into_owned()
    }
}

/// Full lowercase hex.
#[derive(Debug, Default, Clone, Copy)]
pub struct HexFormatter;

impl LeafFormatter for HexFormatter {
    fn format_leaf(&self, data: &[u8]) -> String {
        hex::encode(data)
    }
}

impl NodeFormatter for HexFormatter {
    fn format_node(&self, digest: &[u8]) -> String {
        hex::encode(digest)
    }
}

/// Hex of the first and last two bytes, e.g. `7b50…c81f`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TruncatedHexFormatter;

/// Hex of the first and last two bytes joined by `…`, or
/// the full hex for short inputs.
pub fn to_truncated_hex(bytes: &[u8]) -> String {
    if bytes.len() <= TRUNCATED_BYTES {
        return hex::encode(bytes);
    }
    format!(
        "{}…{}",
        hex::encode(&bytes[..TRUNCATED_BYTES]),
        hex::encode(&bytes[bytes.len().saturating_sub(TRUNCATED_BYTES)..])
    )
}

impl LeafFormatter for TruncatedHexFormatter {
    fn format_leaf(&self, data: &[u8]) -> String {
        to_truncated_hex(data)
    }
}

impl NodeFormatter for TruncatedHexFormatter {
    fn format_node(&self, digest: &[u8]) -> String {
        to_truncated_hex(digest)
    }
}

/// Renders a [`MerkleTree`] as a single-line DOT digraph.
pub struct DotExporter<'a> {
    leaf_formatter: &'a dyn LeafFormatter,
    node_formatter: &'a dyn NodeFormatter,
}

impl Default for DotExporter<'_> {
    fn default() -> Self {
        DotExporter::new()
    }
}

impl<'a> DotExporter<'a> {
    /// Exporter with truncated hex labels for leaves and nodes.
    pub fn new() -> Self {
        DotExporter {
            leaf_formatter: &TruncatedHexFormatter,
            node_formatter: &TruncatedHexFormatter,
        }
    }

    /// Use `formatter` for leaf labels.
    pub fn leaf_formatter(mut self, formatter: &'a dyn LeafFormatter) -> Self {
        self.leaf_formatter = formatter;
        self
    }

    /// Use `formatter` for node labels.
    pub fn node_formatter(mut self, formatter: &'a dyn NodeFormatter) -> Self {
        self.node_formatter = formatter;
        self
    }

    /// Render `tree`, labelling leaves from `leaves`, which must be the data
    /// the tree was built from.
    pub fn render<H: HashProvider, D: AsRef<[u8]>>(
        &self,
        tree: &MerkleTree<H>,
        leaves: &[D],
    ) -> Result<String, VisualizeError> {
        let (leaf_count, padded_leaf_count) = tree.size();
        if leaves.len() != leaf_count {
            return Err(VisualizeError::LeafCountMismatch {
                expected: leaf_count,
                actual: leaves.len(),
            });
        }

        let mut out = String::new();
        out.push_str("digraph MerkleTree {rankdir = TB;node [shape=rectangle margin=\"0.2,0.2\"];");

        for position in 0..padded_leaf_count {
            let index = padded_leaf_count + position;
            if let Some(data) = leaves.get(position) {
                let label = escape(&self.leaf_formatter.format_leaf(data.as_ref()));
                write!(out, "\"{label}\" [shape=oval];\"{label}\"->{index}")?;
                if tree.is_salted() {
                    write!(out, " [label=\"+{position:08x}\"]")?;
                }
                out.push(';');
            }
            self.write_node(&mut out, tree, index, |out| {
                if position > 0 {
                    write!(out, "{}->{index} [style=invisible arrowhead=none];", index - 1)?;
                }
                Ok(())
            })?;
        }

        write!(
            out,
            "{{rank=same;{}}};",
            (padded_leaf_count..2 * padded_leaf_count).join(";")
        )?;

        for index in (1..padded_leaf_count).rev() {
            self.write_node(&mut out, tree, index, |_| Ok(()))?;
        }

        out.push('}');
        Ok(out)
    }

    /// Node label, anything `between` writes, then the edge to the parent.
    fn write_node<H: HashProvider>(
        &self,
        out: &mut String,
        tree: &MerkleTree<H>,
        index: usize,
        between: impl FnOnce(&mut String) -> fmt::Result,
    ) -> Result<(), VisualizeError> {
        let digest = tree.node_digest(index)?;
        write!(
            out,
            "{index} [label=\"{}\"];",
            escape(&self.node_formatter.format_node(digest))
        )?;
        between(out)?;
        if index > 1 {
            write!(out, "{index}->{};", index / 2)?;
        }
        Ok(())
    }
}

/// Escape a label for use inside a quoted DOT identifier.
fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use merkletree_pollard::{Blake2b256, Keccak256};
    use pretty_assertions::assert_eq;

    use super::*;

    fn leaves(values: &[&str]) -> Vec<Vec<u8>> {
        values.iter().map(|v| v.as_bytes().to_vec()).collect()
    }

    fn render_strings<H: HashProvider>(values: &[&str], hash: H, salted: bool) -> String {
        let data = leaves(values);
        let tree = MerkleTree::build(&data, hash, salted)
            .expect("build should succeed");
        DotExporter::new()
            .leaf_formatter(&StringFormatter)
            .render(&tree, &data)
            .expect("render should succeed")
    }

    #[test]
    fn test_truncated_hex() {
        assert_eq!(to_truncated_hex(b"Foo"), "466f…6f6f");
        assert_eq!(to_truncated_hex(b"Quux"), "5175…7578");
        assert_eq!(to_truncated_hex(b"ab"), "6162");
        assert_eq!(to_truncated_hex(b""), "");
    }

    #[test]
    fn test_single_leaf() {
        assert_eq!(
            render_strings(&["Foo"], Blake2b256, false),
            r#"digraph MerkleTree {rankdir = TB;node [shape=rectangle margin="0.2,0.2"];"Foo" [shape=oval];"Foo"->1;1 [label="7b50…c81f"];{rank=same;1};}"#
        );
    }

    #[test]
    fn test_salted_pair() {
        assert_eq!(
            render_strings(&["Foo", "Bar"], Blake2b256, true),
            r#"digraph MerkleTree {rankdir = TB;node [shape=rectangle margin="0.2,0.2"];"Foo" [shape=oval];"Foo"->2 [label="+00000000"];2 [label="2434…cfac"];2->1;"Bar" [shape=oval];"Bar"->3 [label="+00000001"];3 [label="f40e…406d"];2->3 [style=invisible arrowhead=none];3->1;{rank=same;2;3};1 [label="8d18…354d"];}"#
        );
        assert_eq!(
            render_strings(&["Foo", "Bar"], Keccak256, true),
            r#"digraph MerkleTree {rankdir = TB;node [shape=rectangle margin="0.2,0.2"];"Foo" [shape=oval];"Foo"->2 [label="+00000000"];2 [label="0b34…c7b9"];2->1;"Bar" [shape=oval];"Bar"->3 [label="+00000001"];3 [label="5621…a66c"];2->3 [style=invisible arrowhead=none];3->1;{rank=same;2;3};1 [label="e637…f3b6"];}"#
        );
    }

    #[test]
    fn test_padding_leaves_have_no_oval() {
        assert_eq!(
            render_strings(&["Foo", "Bar", "Baz"], Blake2b256, false),
            r#"digraph MerkleTree {rankdir = TB;node [shape=rectangle margin="0.2,0.2"];"Foo" [shape=oval];"Foo"->4;4 [label="7b50…c81f"];4->2;"Bar" [shape=oval];"Bar"->5;5 [label="03c7…6406"];4->5 [style=invisible arrowhead=none];5->2;"Baz" [shape=oval];"Baz"->6;6 [label="6d5f…2ae0"];5->6 [style=invisible arrowhead=none];6->3;7 [label="0000…0000"];6->7 [style=invisible arrowhead=none];7->3;{rank=same;4;5;6;7};3 [label="113f…1135"];3->1;2 [label="e9e0…f637"];2->1;1 [label="2c95…4203"];}"#
        );
        assert_eq!(
            render_strings(&["Foo", "Bar", "Baz", "Qux", "Quux", "Quuz"], Blake2b256, false),
            r#"digraph MerkleTree {rankdir = TB;node [shape=rectangle margin="0.2,0.2"];"Foo" [shape=oval];"Foo"->8;8 [label="7b50…c81f"];8->4;"Bar" [shape=oval];"Bar"->9;9 [label="03c7…6406"];8->9 [style=invisible arrowhead=none];9->4;"Baz" [shape=oval];"Baz"->10;10 [label="6d5f…2ae0"];9->10 [style=invisible arrowhead=none];10->5;"Qux" [shape=oval];"Qux"->11;11 [label="d5d1…3cda"];10->11 [style=invisible arrowhead=none];11->5;"Quux" [shape=oval];"Quux"->12;12 [label="2fec…1151"];11->12 [style=invisible arrowhead=none];12->6;"Quuz" [shape=oval];"Quuz"->13;13 [label="aff2…62e5"];12->13 [style=invisible arrowhead=none];13->6;14 [label="0000…0000"];13->14 [style=invisible arrowhead=none];14->7;15 [label="0000…0000"];14->15 [style=invisible arrowhead=none];15->7;{rank=same;8;9;10;11;12;13;14;15};7 [label="0eb9…9761"];7->3;6 [label="3705…4377"];6->3;5 [label="f277…7fd5"];5->2;4 [label="e9e0…f637"];4->2;3 [label="5082…d5f0"];3->1;2 [label="7799…9592"];2->1;1 [label="9db4…516d"];}"#
        );
    }

    #[test]
    fn test_salted_nine_leaves() {
        assert_eq!(
            render_strings(
                &["Foo", "Bar", "Baz", "Qux", "Quux", "Quuz", "FooBar", "FooBaz", "BarBaz"],
                Blake2b256,
                true
            ),
            r#"digraph MerkleTree {rankdir = TB;node [shape=rectangle margin="0.2,0.2"];"Foo" [shape=oval];"Foo"->16 [label="+00000000"];16 [label="2434…cfac"];16->8;"Bar" [shape=oval];"Bar"->17 [label="+00000001"];17 [label="f40e…406d"];16->17 [style=invisible arrowhead=none];17->8;"Baz" [shape=oval];"Baz"->18 [label="+00000002"];18 [label="7c7c…5a1c"];17->18 [style=invisible arrowhead=none];18->9;"Qux" [shape=oval];"Qux"->19 [label="+00000003"];19 [label="b718…ea0d"];18->19 [style=invisible arrowhead=none];19->9;"Quux" [shape=oval];"Quux"->20 [label="+00000004"];20 [label="be71…083a"];19->20 [style=invisible arrowhead=none];20->10;"Quuz" [shape=oval];"Quuz"->21 [label="+00000005"];21 [label="73a8…bc0f"];20->21 [style=invisible arrowhead=none];21->10;"FooBar" [shape=oval];"FooBar"->22 [label="+00000006"];22 [label="e8b3…5f20"];21->22 [style=invisible arrowhead=none];22->11;"FooBaz" [shape=oval];"FooBaz"->23 [label="+00000007"];23 [label="970f…8911"];22->23 [style=invisible arrowhead=none];23->11;"BarBaz" [shape=oval];"BarBaz"->24 [label="+00000008"];24 [label="cb70…bc43"];23->24 [style=invisible arrowhead=none];24->12;25 [label="0000…0000"];24->25 [style=invisible arrowhead=none];25->12;26 [label="0000…0000"];25->26 [style=invisible arrowhead=none];26->13;27 [label="0000…0000"];26->27 [style=invisible arrowhead=none];27->13;28 [label="0000…0000"];27->28 [style=invisible arrowhead=none];28->14;29 [label="0000…0000"];28->29 [style=invisible arrowhead=none];29->14;30 [label="0000…0000"];29->30 [style=invisible arrowhead=none];30->15;31 [label="0000…0000"];30->31 [style=invisible arrowhead=none];31->15;{rank=same;16;17;18;19;20;21;22;23;24;25;26;27;28;29;30;31};15 [label="0eb9…9761"];15->7;14 [label="0eb9…9761"];14->7;13 [label="0eb9…9761"];13->6;12 [label="e9d0…3bad"];12->6;11 [label="b3c6…0cd2"];11->5;10 [label="7473…a3a4"];10->5;9 [label="6dc5…fd2b"];9->4;8 [label="8d18…354d"];8->4;7 [label="85c0…c3b1"];7->3;6 [label="fb16…ac5b"];6->3;5 [label="4847…84bf"];5->2;4 [label="622b…1133"];4->2;3 [label="ee7e…8174"];3->1;2 [label="286d…fea8"];2->1;1 [label="6530…4dbd"];}"#
        );
    }

    #[test]
    fn test_formatters() {
        let data = leaves(&["Foo", "Bar", "Baz"]);
        let tree = MerkleTree::new(&data)
            .expect("build should succeed");

        assert_eq!(
            DotExporter::new().render(&tree, &data).expect("render should succeed"),
            r#"digraph MerkleTree {rankdir = TB;node [shape=rectangle margin="0.2,0.2"];"466f…6f6f" [shape=oval];"466f…6f6f"->4;4 [label="7b50…c81f"];4->2;"4261…6172" [shape=oval];"4261…6172"->5;5 [label="03c7…6406"];4->5 [style=invisible arrowhead=none];5->2;"4261…617a" [shape=oval];"4261…617a"->6;6 [label="6d5f…2ae0"];5->6 [style=invisible arrowhead=none];6->3;7 [label="0000…0000"];6->7 [style=invisible arrowhead=none];7->3;{rank=same;4;5;6;7};3 [label="113f…1135"];3->1;2 [label="e9e0…f637"];2->1;1 [label="2c95…4203"];}"#
        );
        assert_eq!(
            DotExporter::new()
                .leaf_formatter(&HexFormatter)
                .node_formatter(&HexFormatter)
                .render(&tree, &data)
                .expect("render should succeed"),
            r#"digraph MerkleTree {rankdir = TB;node [shape=rectangle margin="0.2,0.2"];"466f6f" [shape=oval];"466f6f"->4;4 [label="7b506db718d5cce819ca4d33d2348065a5408cc89aa8b3f7ac70a0c186a2c81f"];4->2;"426172" [shape=oval];"426172"->5;5 [label="03c70c07424c7d85174bf8e0dbd4600a4bd21c00ce34dea7ab57c83c398e6406"];4->5 [style=invisible arrowhead=none];5->2;"42617a" [shape=oval];"42617a"->6;6 [label="6d5fd2391f8abb79469edf404fd1751a74056ce54ee438c128bba9e680242ae0"];5->6 [style=invisible arrowhead=none];6->3;7 [label="0000000000000000000000000000000000000000000000000000000000000000"];6->7 [style=invisible arrowhead=none];7->3;{rank=same;4;5;6;7};3 [label="113f21ad3be5252e487795473d5e0e221fddf3daee6b5596635428e5feaa1135"];3->1;2 [label="e9e0083e456539e9f6336164cd98700e668178f98af147ef750eb90afcf2f637"];2->1;1 [label="2c95331b1a38dba3600391a3e864f9418a271388936e54edecd916824bb54203"];}"#
        );
    }

    #[test]
    fn test_quotes_in_leaf_labels_are_escaped() {
        let output = render_strings(&["say \"hi\""], Blake2b256, false);
        assert!(output.contains(r#""say \"hi\"" [shape=oval];"#));
    }

    #[test]
    fn test_tree_errors_are_carried() {
        let err = VisualizeError::from(MerkleTreeError::IndexOutOfRange { index: 8, limit: 7 });
        assert!(matches!(
            err,
            VisualizeError::Tree(MerkleTreeError::IndexOutOfRange { index: 8, limit: 7 })
        ));
        assert_eq!(err.to_string(), "tree error: index 8 out of range (limit 7)");
    }

    #[test]
    fn test_leaf_count_mismatch() {
        let data = leaves(&["Foo", "Bar", "Baz"]);
        let tree = MerkleTree::new(&data)
            .expect("build should succeed");
        let err = DotExporter::new()
            .render(&tree, &data[..2])
            .expect_err("two leaves for a three-leaf tree");
        assert!(matches!(
            err,
            VisualizeError::LeafCountMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }
}
