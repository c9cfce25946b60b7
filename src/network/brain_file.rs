//! Flat text persistence for a trained network.
//!
//! Layout, one record per line, floats with 9 fixed decimals:
//!
//! ```text
//! input count
//! hidden count
//! output count
//! input activations        value                 (input count lines)
//! input -> hidden weights  i j weight            (row-major)
//! input bias weights       j weight
//! hidden -> output weights i j weight            (row-major)
//! hidden bias weights      j weight
//! output activations       i value
//! ```
//!
//! Every `i`/`j` token is checked against the position it is read at.
//! Training settings are not stored; a loaded network starts with the
//! defaults and the caller reapplies them.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use log::debug;

use crate::error::{NetError, Result};
use crate::layers::dense::{Layer, Links};
use crate::network::network::{LayerKind, Network};
use crate::network::topology::Topology;

const HEADER: &str = "header";
const INPUT_ACTIVATIONS: &str = "input activations";
const INPUT_WEIGHTS: &str = "input weights";
const INPUT_BIASES: &str = "input bias weights";
const HIDDEN_WEIGHTS: &str = "hidden weights";
const HIDDEN_BIASES: &str = "hidden bias weights";
const OUTPUT_ACTIVATIONS: &str = "output activations";

impl Network {
    /// Writes the network to `path` in the flat text format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_brain(&mut writer)?;
        writer.flush()?;
        debug!("saved {} network to {}", self.topology(), path.display());
        Ok(())
    }

    /// Reads a network written by `save`.
    pub fn load(path: impl AsRef<Path>) -> Result<Network> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let network = Network::read_brain(BufReader::new(file))?;
        debug!("loaded {} network from {}", network.topology(), path.display());
        Ok(network)
    }

    pub fn write_brain<W: Write>(&self, mut w: W) -> Result<()> {
        let topology = self.topology();
        writeln!(w, "{}", topology.input)?;
        writeln!(w, "{}", topology.hidden)?;
        writeln!(w, "{}", topology.output)?;

        let input = self.layer(LayerKind::Input);
        for a in &input.activations {
            writeln!(w, "{:.9}", a)?;
        }
        write_links(&mut w, input)?;
        write_links(&mut w, self.layer(LayerKind::Hidden))?;

        for (i, a) in self.layer(LayerKind::Output).activations.iter().enumerate() {
            writeln!(w, "{} {:.9}", i, a)?;
        }
        Ok(())
    }

    /// Parses the flat text format. The network is only returned once every
    /// record has passed its check, so a bad file never yields a partly
    /// filled network.
    pub fn read_brain<R: Read>(mut r: R) -> Result<Network> {
        let mut text = String::new();
        r.read_to_string(&mut text).map_err(|e| match e.kind() {
            ErrorKind::InvalidData => NetError::CorruptFile {
                line: 0,
                section: HEADER,
                detail: "file is not valid UTF-8 text".into(),
            },
            _ => NetError::Io(e),
        })?;
        let mut tokens = Tokens::new(&text);

        let topology = Topology::new(
            tokens.count(HEADER)?,
            tokens.count(HEADER)?,
            tokens.count(HEADER)?,
        );
        tokens.expect_records(topology)?;
        let mut network = Network::zeroed(topology)?;

        for slot in network.layer_mut(LayerKind::Input).activations.iter_mut() {
            *slot = tokens.value(INPUT_ACTIVATIONS)?;
        }
        read_links(&mut tokens, network.layer_mut(LayerKind::Input), INPUT_WEIGHTS, INPUT_BIASES)?;
        read_links(&mut tokens, network.layer_mut(LayerKind::Hidden), HIDDEN_WEIGHTS, HIDDEN_BIASES)?;
        for (i, slot) in network.layer_mut(LayerKind::Output).activations.iter_mut().enumerate() {
            tokens.index(i, OUTPUT_ACTIVATIONS)?;
            *slot = tokens.value(OUTPUT_ACTIVATIONS)?;
        }

        tokens.finish()?;
        Ok(network)
    }
}

fn write_links<W: Write>(w: &mut W, layer: &Layer) -> Result<()> {
    let links = connections(layer)?;
    for i in 0..layer.node_count {
        for (j, weight) in links.weights.row(i).iter().enumerate() {
            writeln!(w, "{} {} {:.9}", i, j, weight)?;
        }
    }
    for (j, weight) in links.bias_weights.iter().enumerate() {
        writeln!(w, "{} {:.9}", j, weight)?;
    }
    Ok(())
}

fn read_links(
    tokens: &mut Tokens<'_>,
    layer: &mut Layer,
    weights_section: &'static str,
    bias_section: &'static str,
) -> Result<()> {
    let node_count = layer.node_count;
    let links = layer.links.as_mut().ok_or_else(|| {
        NetError::InvalidTopology("layer has no outgoing weights".into())
    })?;
    for i in 0..node_count {
        for j in 0..links.weights.cols {
            tokens.index(i, weights_section)?;
            tokens.index(j, weights_section)?;
            links.weights[(i, j)] = tokens.value(weights_section)?;
        }
    }
    for (j, slot) in links.bias_weights.iter_mut().enumerate() {
        tokens.index(j, bias_section)?;
        *slot = tokens.value(bias_section)?;
    }
    Ok(())
}

fn connections(layer: &Layer) -> Result<&Links> {
    layer.links.as_ref().ok_or_else(|| {
        NetError::InvalidTopology("layer has no outgoing weights".into())
    })
}

/// Token count following the header: input activations, input weights and
/// biases, hidden weights and biases, output activations.
fn record_tokens(t: Topology) -> Option<usize> {
    let input_weights = t.input.checked_mul(t.hidden)?.checked_mul(3)?;
    let hidden_weights = t.hidden.checked_mul(t.output)?.checked_mul(3)?;
    t.input
        .checked_add(input_weights)?
        .checked_add(t.hidden.checked_mul(2)?)?
        .checked_add(hidden_weights)?
        .checked_add(t.output.checked_mul(2)?)?
        .checked_add(t.output.checked_mul(2)?)
}

/// Whitespace-separated tokens tagged with their 1-based line number.
struct Tokens<'a> {
    items: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Tokens<'a> {
        let items = text.lines()
            .enumerate()
            .flat_map(|(n, line)| line.split_whitespace().map(move |tok| (n + 1, tok)))
            .collect();
        Tokens { items, pos: 0 }
    }

    fn advance(&mut self, section: &'static str) -> Result<(usize, &'a str)> {
        let item = self.items.get(self.pos).copied().ok_or_else(|| NetError::CorruptFile {
            line: self.items.last().map_or(0, |&(n, _)| n),
            section,
            detail: "unexpected end of file".into(),
        })?;
        self.pos += 1;
        Ok(item)
    }

    /// A layer size from the header; must be a positive integer.
    fn count(&mut self, section: &'static str) -> Result<usize> {
        let (line, tok) = self.advance(section)?;
        match tok.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(NetError::CorruptFile {
                line,
                section,
                detail: format!("'{}' is not a valid layer size", tok),
            }),
        }
    }

    /// An index token that must equal `expected`.
    fn index(&mut self, expected: usize, section: &'static str) -> Result<()> {
        let (line, tok) = self.advance(section)?;
        match tok.parse::<usize>() {
            Ok(found) if found == expected => Ok(()),
            Ok(found) => Err(NetError::CorruptFile {
                line,
                section,
                detail: format!("index {} found where {} was expected", found, expected),
            }),
            Err(_) => Err(NetError::CorruptFile {
                line,
                section,
                detail: format!("'{}' is not an index", tok),
            }),
        }
    }

    fn value(&mut self, section: &'static str) -> Result<f64> {
        let (line, tok) = self.advance(section)?;
        tok.parse::<f64>().map_err(|_| NetError::CorruptFile {
            line,
            section,
            detail: format!("'{}' is not a number", tok),
        })
    }

    /// Confirms the file holds exactly as many tokens as the header sizes
    /// imply, before anything is allocated for them.
    fn expect_records(&self, t: Topology) -> Result<()> {
        let line = self.pos.checked_sub(1)
            .and_then(|k| self.items.get(k))
            .map_or(0, |&(n, _)| n);
        let remaining = self.items.len() - self.pos;
        match record_tokens(t) {
            Some(needed) if needed == remaining => Ok(()),
            Some(needed) => Err(NetError::CorruptFile {
                line,
                section: HEADER,
                detail: format!("sizes {} need {} values but the file holds {}", t, needed, remaining),
            }),
            None => Err(NetError::CorruptFile {
                line,
                section: HEADER,
                detail: format!("sizes {} are too large", t),
            }),
        }
    }

    fn finish(&self) -> Result<()> {
        match self.items.get(self.pos) {
            None => Ok(()),
            Some(&(line, tok)) => Err(NetError::CorruptFile {
                line,
                section: OUTPUT_ACTIVATIONS,
                detail: format!("trailing data starting at '{}'", tok),
            }),
        }
    }
}
