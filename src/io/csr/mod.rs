//! Compressed Sparse Row (CSR) format for adjacency graphs.
//!
//! Layout (little-endian): magic `CSR1`, `n: u64`, `nnz: u64`,
//! `indptr: [u64; n + 1]`, `indices: [u32; nnz]`.

use std::{fs::File, io::{BufReader, Cursor, Read, Write}, path::Path};

use anyhow::{ensure, Context, Result};

use crate::graph::AdjacencyGraph;

const MAGIC: &[u8; 4] = b"CSR1";

/// Write a graph to CSR binary bytes.
pub(crate) fn write_csr_bytes(graph: &AdjacencyGraph) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(20 + 8 * (graph.node_count() + 1) + 4 * graph.nnz());
    write_csr(&mut out, graph)?;
    Ok(out)
}

/// Read neighbor lists from CSR binary bytes.
pub fn read_csr_bytes(bytes: &[u8]) -> Result<Vec<Vec<u32>>> {
    read_csr_from(&mut Cursor::new(bytes))
}

/// Read neighbor lists from a `.csr` file.
pub fn read_csr(path: &Path) -> Result<Vec<Vec<u32>>> {
    let file = File::open(path)
        .with_context(|| format!("[io::csr] Failed to open {}", path.display()))?;
    read_csr_from(&mut BufReader::new(file))
        .with_context(|| format!("[io::csr] Failed to read {}", path.display()))
}

fn write_csr<W: Write>(writer: &mut W, graph: &AdjacencyGraph) -> Result<()> {
    // Header
    writer.write_all(MAGIC)
        .context("[io::csr] Failed to write magic bytes")?;
    writer.write_all(&(graph.node_count() as u64).to_le_bytes())
        .context("[io::csr] Failed to write row count")?;
    writer.write_all(&(graph.nnz() as u64).to_le_bytes())
        .context("[io::csr] Failed to write nnz")?;

    // indptr
    for &o in graph.offsets() {
        writer.write_all(&(o as u64).to_le_bytes())
            .context("[io::csr] Failed to write indptr")?;
    }

    // indices
    for &j in graph.edges() {
        writer.write_all(&j.to_le_bytes())
            .context("[io::csr] Failed to write indices")?;
    }

    Ok(())
}

fn read_csr_from<R: Read>(reader: &mut R) -> Result<Vec<Vec<u32>>> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)
        .context("[io::csr] Failed to read magic bytes")?;
    ensure!(&magic == MAGIC, "[io::csr] Invalid CSR magic: expected 'CSR1'");

    let mut b8 = [0u8; 8];
    reader.read_exact(&mut b8)
        .context("[io::csr] Failed to read row count")?;
    let n = u64::from_le_bytes(b8) as usize;

    reader.read_exact(&mut b8)
        .context("[io::csr] Failed to read nnz")?;
    let nnz = u64::from_le_bytes(b8) as usize;

    let mut indptr = vec![0u64; n + 1];
    for o in &mut indptr {
        reader.read_exact(&mut b8)
            .context("[io::csr] Failed to read indptr")?;
        *o = u64::from_le_bytes(b8);
    }
    ensure!(indptr[0] == 0, "[io::csr] indptr must start at 0");
    ensure!(indptr.windows(2).all(|w| w[0] <= w[1]), "[io::csr] indptr is not non-decreasing");
    ensure!(indptr[n] as usize == nnz, "[io::csr] nnz mismatch: header {} vs indptr {}", nnz, indptr[n]);

    let mut indices = vec![0u32; nnz];
    let mut b4 = [0u8; 4];
    for x in &mut indices {
        reader.read_exact(&mut b4)
            .context("[io::csr] Failed to read indices")?;
        *x = u32::from_le_bytes(b4);
        ensure!((*x as usize) < n, "[io::csr] neighbor index {} out of range for {} rows", x, n);
    }

    Ok(indptr.windows(2)
        .map(|w| indices[w[0] as usize..w[1] as usize].to_vec())
        .collect())
}
