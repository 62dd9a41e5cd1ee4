//! The three forwarding buffers that bypass in-flight results to earlier
//! pipeline stages.

/// One row of a forwarding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Row {
    dest_reg: u8,
    value: i32,
    valid: bool,
}

/// A fixed-size table of forwarding rows, keyed by producing-stage position.
///
/// Producers call [`ForwardingTable::fill`]; consumers call
/// [`ForwardingTable::forward`], which returns the value of the first valid
/// row whose destination matches — "first" here meaning lowest row index,
/// i.e. the most recently produced value wins when more than one row names
/// the same register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardingTable<const N: usize> {
    rows: [Row; N],
}

impl<const N: usize> Default for ForwardingTable<N> {
    fn default() -> Self {
        Self { rows: [Row::default(); N] }
    }
}

impl<const N: usize> ForwardingTable<N> {
    /// Publishes `value` for `dest_reg` into `row_index`.
    pub fn fill(&mut self, row_index: usize, dest_reg: u8, value: i32) {
        self.rows[row_index] = Row { dest_reg, value, valid: true };
    }

    /// Invalidates `row_index`. Bubbles call this for every row position
    /// they own as they advance through a stage.
    pub fn clear(&mut self, row_index: usize) {
        self.rows[row_index] = Row::default();
    }

    /// Returns the forwarded value for `reg`, if any row holds a valid,
    /// matching entry.
    pub fn forward(&self, reg: u8) -> Option<i32> {
        self.rows.iter().find(|row| row.valid && row.dest_reg == reg).map(|row| row.value)
    }
}

/// The three forwarding buffers owned by the pipeline engine.
///
/// - `id_fwd` feeds ID: row 0 = EX1, 1 = EX2, 2 = EX3, 3 = MEM.
/// - `ex_fwd` feeds EX1: row 0 = EX2, 1 = EX3, 2 = MEM.
/// - `da_fwd` feeds MEM: row 0 = MEM (one instruction ahead in MEM
///   completion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForwardingBuffers {
    /// Consumed by ID.
    pub id_fwd: ForwardingTable<4>,
    /// Consumed by EX1.
    pub ex_fwd: ForwardingTable<3>,
    /// Consumed by MEM.
    pub da_fwd: ForwardingTable<1>,
}

impl ForwardingBuffers {
    /// Builds all three tables empty.
    pub fn new() -> Self {
        Self::default()
    }
}
