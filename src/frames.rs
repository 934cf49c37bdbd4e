use crate::reference::Ref;

/// Per-frame map from original node ids to nodes of the unrolled copy.
///
/// Row `f` holds, for every node of the original network, the edge it was
/// unrolled into in frame `f`, or `None` while that pair is unbuilt.
#[derive(Debug, Clone, Default)]
pub struct FrameMap {
    rows: Vec<Vec<Option<Ref>>>,
    width: usize,
}

impl FrameMap {
    /// Create an empty map for a network with `width` node ids.
    pub fn new(width: usize) -> Self {
        Self {
            rows: Vec::new(),
            width,
        }
    }

    /// Number of frames that have a row.
    pub fn num_frames(&self) -> usize {
        self.rows.len()
    }

    /// Make sure rows exist for frames `0..=frame`.
    pub fn ensure_frame(&mut self, frame: u32) {
        let needed = frame as usize + 1;
        if self.rows.len() < needed {
            let width = self.width;
            self.rows.resize_with(needed, || vec![None; width]);
        }
    }

    pub fn get(&self, id: u32, frame: u32) -> Option<Ref> {
        self.rows
            .get(frame as usize)
            .and_then(|row| row[id as usize])
    }

    pub fn set(&mut self, id: u32, frame: u32, value: Ref) {
        self.ensure_frame(frame);
        self.rows[frame as usize][id as usize] = Some(value);
    }

    pub fn clear(&mut self, id: u32, frame: u32) {
        if let Some(row) = self.rows.get_mut(frame as usize) {
            row[id as usize] = None;
        }
    }

    /// Number of built entries over all frames.
    pub fn num_entries(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().filter(|e| e.is_some()).count())
            .sum()
    }
}
