use std::collections::BTreeMap;

use crate::types::{Result, SeqGraphError};

/// Pool of free element indices stored as disjoint runs.
///
/// Indices start at 1; index 0 is the placeholder of unassigned elements.
/// Allocation always hands out the lowest free index so released ids are
/// reused before the pool grows. When the pool is exhausted its capacity
/// doubles, up to `limit`.
#[derive(Clone, Debug)]
pub struct FreeIndexPool {
    /// Free runs keyed by first index, valued by run length.
    runs: BTreeMap<u32, u32>,
    capacity: u32,
    limit: u32,
    used: u32,
}

impl FreeIndexPool {
    /// Creates a pool with indices `1..=capacity` free.
    pub fn new(capacity: u32, limit: u32) -> Self {
        let capacity = capacity.clamp(1, limit.max(1));
        let mut runs = BTreeMap::new();
        runs.insert(1, capacity);
        Self {
            runs,
            capacity,
            limit: limit.max(capacity),
            used: 0,
        }
    }

    /// Highest index the pool currently manages.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of allocated indices.
    pub fn used(&self) -> u32 {
        self.used
    }

    /// Returns `true` if `index` lies inside the managed range.
    pub fn in_range(&self, index: u32) -> bool {
        index >= 1 && index <= self.capacity
    }

    /// Returns `true` if `index` is currently allocated.
    pub fn is_used(&self, index: u32) -> bool {
        self.in_range(index) && self.run_containing(index).is_none()
    }

    /// Hands out the lowest free index.
    pub fn allocate(&mut self) -> Result<u32> {
        if self.runs.is_empty() {
            self.grow()?;
        }
        let (&start, &len) = self
            .runs
            .iter()
            .next()
            .ok_or(SeqGraphError::IdSpaceExhausted)?;
        self.runs.remove(&start);
        if len > 1 {
            self.runs.insert(start + 1, len - 1);
        }
        self.used += 1;
        Ok(start)
    }

    /// Marks a specific index as used, growing the pool if needed. Used when
    /// restoring a graph whose ids were allocated in an earlier session.
    pub fn reserve(&mut self, index: u32) -> Result<()> {
        if index == 0 {
            return Err(SeqGraphError::Invalid("index 0 is reserved"));
        }
        while index > self.capacity {
            self.grow()?;
        }
        let Some((start, len)) = self.run_containing(index) else {
            return Err(SeqGraphError::Invalid("index already in use"));
        };
        self.runs.remove(&start);
        if index > start {
            self.runs.insert(start, index - start);
        }
        let end = start + len;
        if index + 1 < end {
            self.runs.insert(index + 1, end - index - 1);
        }
        self.used += 1;
        Ok(())
    }

    /// Returns `index` to the pool.
    pub fn release(&mut self, index: u32) -> Result<()> {
        if !self.is_used(index) {
            return Err(SeqGraphError::Invalid("index is not allocated"));
        }
        let mut start = index;
        let mut len = 1;
        if let Some((&prev_start, &prev_len)) = self.runs.range(..index).next_back() {
            if prev_start + prev_len == index {
                self.runs.remove(&prev_start);
                start = prev_start;
                len += prev_len;
            }
        }
        if let Some(next_len) = self.runs.remove(&(index + 1)) {
            len += next_len;
        }
        self.runs.insert(start, len);
        self.used -= 1;
        Ok(())
    }

    fn run_containing(&self, index: u32) -> Option<(u32, u32)> {
        self.runs
            .range(..=index)
            .next_back()
            .filter(|&(&start, &len)| index < start + len)
            .map(|(&start, &len)| (start, len))
    }

    fn grow(&mut self) -> Result<()> {
        if self.capacity >= self.limit {
            return Err(SeqGraphError::IdSpaceExhausted);
        }
        let new_capacity = self.capacity.saturating_mul(2).min(self.limit);
        let added_start = self.capacity + 1;
        let added_len = new_capacity - self.capacity;
        match self.runs.range(..added_start).next_back() {
            Some((&start, &len)) if start + len == added_start => {
                self.runs.insert(start, len + added_len);
            }
            _ => {
                self.runs.insert(added_start, added_len);
            }
        }
        self.capacity = new_capacity;
        Ok(())
    }
}
