use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};

use crate::common::{PageId, QuarryError, RecordId, Result, SlotId, TransactionId};
use crate::tuple::{Tuple, TupleDesc};

/// Most slots a page may have; slot numbers must fit a `SlotId`.
pub const MAX_SLOTS_PER_PAGE: usize = u16::MAX as usize + 1;

/// Heap page layout:
///
/// ```text
/// +----------------------+--------+--------+-----+------------+---------+
/// | Header bitmap        | Slot 0 | Slot 1 | ... | Slot N-1   | Padding |
/// | ceil(N / 8) bytes    |        |        |     |            |         |
/// +----------------------+--------+--------+-----+------------+---------+
/// ```
///
/// Every slot is `desc.size()` bytes. Bit `i` of the header (bit `i % 8` of
/// byte `i / 8`, least significant bit first) is set when slot `i` holds a
/// tuple. Trailing header bits past the last slot and all padding are zero.
///
/// The page keeps its tuples decoded; `page_data()` re-encodes them.
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: PageId,
    desc: Arc<TupleDesc>,
    slots: Vec<Option<Tuple>>,
    page_size: usize,

    /// Transaction that last dirtied the page, if it has unflushed changes
    dirtier: Option<TransactionId>,

    /// Set once the buffer pool drops this copy; writers must refetch
    retired: bool,
}

impl HeapPage {
    /// Number of tuple slots a page holds: each tuple costs its width plus
    /// one header bit.
    pub fn num_slots_for(page_size: usize, tuple_size: usize) -> usize {
        (page_size * 8) / (tuple_size * 8 + 1)
    }

    /// Checks that `page_size`-byte pages can hold tuples of `desc` and
    /// returns the slot count.
    ///
    /// A page must fit at least one tuple, and no more slots than a
    /// `SlotId` can number.
    pub fn validate_layout(page_size: usize, desc: &TupleDesc) -> Result<usize> {
        if page_size == 0 {
            return Err(QuarryError::schema("page size must be positive"));
        }
        let num_slots = Self::num_slots_for(page_size, desc.size());
        if num_slots == 0 {
            return Err(QuarryError::schema(format!(
                "a {}-byte page cannot hold a {}-byte tuple ({})",
                page_size,
                desc.size(),
                desc
            )));
        }
        if num_slots > MAX_SLOTS_PER_PAGE {
            return Err(QuarryError::schema(format!(
                "a {}-byte page would have {} slots of {} bytes, more than {}",
                page_size,
                num_slots,
                desc.size(),
                MAX_SLOTS_PER_PAGE
            )));
        }
        Ok(num_slots)
    }

    /// Bytes taken by the occupancy bitmap for `num_slots` slots.
    pub fn header_size_for(num_slots: usize) -> usize {
        num_slots.div_ceil(8)
    }

    /// Bytes of a page with no occupied slots.
    pub fn create_empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    /// Creates an empty in-memory page.
    pub fn empty(pid: PageId, desc: Arc<TupleDesc>, page_size: usize) -> Self {
        let num_slots = Self::num_slots_for(page_size, desc.size());
        Self {
            pid,
            desc,
            slots: vec![None; num_slots],
            page_size,
            dirtier: None,
            retired: false,
        }
    }

    /// Decodes a page from its on-disk bytes. The page size is `data.len()`.
    pub fn new(pid: PageId, desc: Arc<TupleDesc>, data: &[u8]) -> Result<Self> {
        let page_size = data.len();
        let tuple_size = desc.size();
        let num_slots = Self::num_slots_for(page_size, tuple_size);
        let header_size = Self::header_size_for(num_slots);
        let header = &data[..header_size];

        let mut slots = Vec::with_capacity(num_slots);
        for i in 0..num_slots {
            if header[i / 8] & (1 << (i % 8)) == 0 {
                slots.push(None);
                continue;
            }
            let start = header_size + i * tuple_size;
            let mut slot = &data[start..start + tuple_size];
            let mut tuple = Tuple::deserialize(desc.clone(), &mut slot)?;
            tuple.set_record_id(Some(RecordId::new(pid, SlotId::new(i as u16))));
            slots.push(Some(tuple));
        }

        Ok(Self {
            pid,
            desc,
            slots,
            page_size,
            dirtier: None,
            retired: false,
        })
    }

    pub fn id(&self) -> PageId {
        self.pid
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Total number of tuple slots on the page.
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn header_size(&self) -> usize {
        Self::header_size_for(self.slots.len())
    }

    pub fn num_empty_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// Returns true if slot `i` holds a tuple. Out-of-range slots are unused.
    pub fn is_slot_used(&self, i: usize) -> bool {
        matches!(self.slots.get(i), Some(Some(_)))
    }

    /// Returns the tuple in slot `i`, if any.
    pub fn tuple(&self, i: usize) -> Option<&Tuple> {
        self.slots.get(i).and_then(|s| s.as_ref())
    }

    /// Encodes the page into exactly `page_size` bytes.
    pub fn page_data(&self) -> Result<Bytes> {
        let tuple_size = self.desc.size();
        let mut buf = BytesMut::with_capacity(self.page_size);

        let mut header = vec![0u8; self.header_size()];
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.is_some() {
                header[i / 8] |= 1 << (i % 8);
            }
        }
        buf.put_slice(&header);

        for slot in &self.slots {
            match slot {
                Some(tuple) => tuple.serialize(&mut buf)?,
                None => buf.put_bytes(0, tuple_size),
            }
        }

        buf.put_bytes(0, self.page_size - buf.len());
        Ok(buf.freeze())
    }

    /// Stores the tuple in the first free slot and returns its new record id.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<RecordId> {
        if **tuple.tuple_desc() != *self.desc {
            return Err(QuarryError::schema(format!(
                "tuple ({}) does not match page layout ({})",
                tuple.tuple_desc(),
                self.desc
            )));
        }
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(QuarryError::PageFull(self.pid))?;

        let rid = RecordId::new(self.pid, SlotId::new(slot as u16));
        tuple.set_record_id(Some(rid));
        self.slots[slot] = Some(tuple);
        Ok(rid)
    }

    /// Clears the slot named by the tuple's record id.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(QuarryError::MissingRecordId)?;
        if rid.page_id != self.pid {
            return Err(QuarryError::RecordNotOnPage {
                record_page: rid.page_id,
                page_id: self.pid,
            });
        }
        let slot = self
            .slots
            .get_mut(rid.slot_id.as_usize())
            .ok_or(QuarryError::InvalidSlotId(rid.slot_id.as_u16()))?;
        if slot.is_none() {
            return Err(QuarryError::EmptySlot {
                page_id: self.pid,
                slot: rid.slot_id.as_u16(),
            });
        }
        *slot = None;
        Ok(())
    }

    /// Iterates over the live tuples in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().flatten()
    }

    /// Marks the page dirty on behalf of `tid`, or clean.
    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirtier = if dirty { Some(tid) } else { None };
    }

    /// Returns the transaction that last dirtied the page, or None if clean.
    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirtier
    }

    /// Returns true once this copy has left the buffer pool. Changes made to
    /// a retired copy are never written back.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub(crate) fn retire(&mut self) {
        self.retired = true;
    }
}
