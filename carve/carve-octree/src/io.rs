//! Binary persistence for the octree.
//!
//! The format is little-endian and self-describing per node: a fixed
//! header (magic, format version, depth, resolution, root geometry
//! being part of the first node record), then a pre-order traversal of
//! `(geometry, has-payload?, payload, child-presence flags)` records.
//!
//! Payloads are versioned. Version 1 predates the `total_weight` and
//! `is_carved` fields; parsing it populates `total_weight` from the
//! sample count and leaves `is_carved` false, so old trees load with
//! their documented defaults intact.

use crate::{LeafData, Node, NodeId, Octree};
use carve_types::{CarveError, Result, CHILDREN_PER_NODE};
use nalgebra::Point3;
use std::io::{Error, ErrorKind, Read, Write};
use tracing::debug;

const MAGIC: &[u8; 8] = b"vcoctree";

/// Current stream format version.
pub(crate) const FORMAT_VERSION: u32 = 2;

impl Octree {
    /// Writes the tree to a binary stream.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::Io`] on write failure.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&self.max_depth().to_le_bytes())?;
        writer.write_all(&self.resolution().to_le_bytes())?;
        self.write_node(writer, self.root())?;
        debug!(nodes = self.len(), "octree serialized");
        Ok(())
    }

    /// Reads a tree from a binary stream produced by
    /// [`Octree::serialize`] (any supported format version).
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::Io`] on read failure, bad magic, or an
    /// unsupported format version.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CarveError::Io(Error::new(
                ErrorKind::InvalidData,
                "not an octree stream (bad magic)",
            )));
        }
        let version = read_u32(reader)?;
        if version == 0 || version > FORMAT_VERSION {
            return Err(CarveError::Io(Error::new(
                ErrorKind::InvalidData,
                format!("unsupported octree format version {version}"),
            )));
        }
        let max_depth = read_u32(reader)?;
        // The resolution is derivable from the root geometry and depth;
        // it is stored for inspectability and skipped on load.
        let _resolution = read_f64(reader)?;

        let mut nodes = Vec::new();
        let root = read_node(reader, version, &mut nodes)?;
        debug!(nodes = nodes.len(), version, "octree parsed");
        Ok(Self::from_parts(nodes, root, max_depth))
    }

    fn write_node<W: Write>(&self, writer: &mut W, id: NodeId) -> Result<()> {
        let node = self.node(id);
        writer.write_all(&node.center.x.to_le_bytes())?;
        writer.write_all(&node.center.y.to_le_bytes())?;
        writer.write_all(&node.center.z.to_le_bytes())?;
        writer.write_all(&node.halfwidth.to_le_bytes())?;

        match &node.data {
            Some(data) => {
                writer.write_all(&[1u8])?;
                write_payload(writer, data)?;
            }
            None => writer.write_all(&[0u8])?,
        }

        for oct in 0..CHILDREN_PER_NODE {
            match self.node(id).children[oct] {
                Some(child) => {
                    writer.write_all(&[1u8])?;
                    self.write_node(writer, child)?;
                }
                None => writer.write_all(&[0u8])?,
            }
        }
        Ok(())
    }
}

fn write_payload<W: Write>(writer: &mut W, data: &LeafData) -> Result<()> {
    writer.write_all(&data.count.to_le_bytes())?;
    writer.write_all(&data.total_weight.to_le_bytes())?;
    writer.write_all(&data.prob_sum.to_le_bytes())?;
    writer.write_all(&data.prob_sum_sq.to_le_bytes())?;
    writer.write_all(&data.surface_sum.to_le_bytes())?;
    writer.write_all(&data.corner_sum.to_le_bytes())?;
    writer.write_all(&data.planar_sum.to_le_bytes())?;
    writer.write_all(&data.fp_room.to_le_bytes())?;
    writer.write_all(&[u8::from(data.is_carved)])?;
    Ok(())
}

fn read_payload<R: Read>(reader: &mut R, version: u32) -> Result<LeafData> {
    let mut data = LeafData::new();
    data.count = read_u32(reader)?;
    data.total_weight = if version >= 2 {
        read_f64(reader)?
    } else {
        // Version 1 carried no per-sample weights.
        f64::from(data.count)
    };
    data.prob_sum = read_f64(reader)?;
    data.prob_sum_sq = read_f64(reader)?;
    data.surface_sum = read_f64(reader)?;
    data.corner_sum = read_f64(reader)?;
    data.planar_sum = read_f64(reader)?;
    data.fp_room = read_i32(reader)?;
    data.is_carved = if version >= 2 {
        read_u8(reader)? != 0
    } else {
        false
    };
    Ok(data)
}

fn read_node<R: Read>(reader: &mut R, version: u32, nodes: &mut Vec<Node>) -> Result<NodeId> {
    let x = read_f64(reader)?;
    let y = read_f64(reader)?;
    let z = read_f64(reader)?;
    let halfwidth = read_f64(reader)?;
    let mut node = Node::new(Point3::new(x, y, z), halfwidth);

    if read_u8(reader)? != 0 {
        node.data = Some(read_payload(reader, version)?);
    }

    #[allow(clippy::cast_possible_truncation)]
    let id = NodeId(nodes.len() as u32);
    nodes.push(node);

    for oct in 0..CHILDREN_PER_NODE {
        if read_u8(reader)? != 0 {
            let child = read_node(reader, version, nodes)?;
            nodes[id.index()].children[oct] = Some(child);
        }
    }
    Ok(id)
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_f64<R: Read>(reader: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}
