/// An address split into the fields a cache level cares about
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Decomposed {
    pub tag: u32,
    pub set_index: u32,
    pub block_offset: u32,
}

/// The geometry of one cache level: its block size and set count, along with the bit widths and
/// masks derived from them
///
/// Both sizes must be non-zero powers of two. This is checked when the configuration is validated,
/// so by the time a geometry exists the bit widths are exact
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Geometry {
    block_size: u32,
    sets: u32,
    offset_bits: u32,
    index_bits: u32,
    offset_mask: u32,
    index_mask: u32,
}

impl Geometry {
    pub fn new(block_size: u32, sets: u32) -> Self {
        debug_assert!(block_size.is_power_of_two(), "block size {block_size} is not a power of two");
        debug_assert!(sets.is_power_of_two(), "set count {sets} is not a power of two");
        let offset_bits = block_size.trailing_zeros();
        let index_bits = sets.trailing_zeros();
        debug_assert!(offset_bits + index_bits <= u32::BITS);
        Self {
            block_size,
            sets,
            offset_bits,
            index_bits,
            offset_mask: block_size - 1,
            index_mask: sets - 1,
        }
    }

    /// Splits an address into tag, set index and block offset
    ///
    /// # Arguments
    ///
    /// * `address`: Any 32-bit address, the function is total
    ///
    /// returns: Decomposed
    ///
    /// # Examples
    ///
    /// ```
    /// use hierlib::address::Geometry;
    /// let geometry = Geometry::new(16, 4);
    /// let parts = geometry.decompose(0x1234);
    /// assert_eq!(parts.block_offset, 0x4);
    /// assert_eq!(parts.set_index, 0x3);
    /// assert_eq!(parts.tag, 0x48);
    /// ```
    pub fn decompose(&self, address: u32) -> Decomposed {
        Decomposed {
            // A level can use all 32 bits for index and offset, leaving no tag at all
            tag: address.checked_shr(self.offset_bits + self.index_bits).unwrap_or(0),
            set_index: (address >> self.offset_bits) & self.index_mask,
            block_offset: address & self.offset_mask,
        }
    }

    /// Rebuilds the address of the first byte of the block identified by `tag` in `set_index`
    pub fn compose(&self, tag: u32, set_index: u32) -> u32 {
        debug_assert!(set_index < self.sets);
        tag.checked_shl(self.offset_bits + self.index_bits).unwrap_or(0) | (set_index << self.offset_bits)
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn sets(&self) -> u32 {
        self.sets
    }

    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }

    pub fn tag_bits(&self) -> u32 {
        u32::BITS - self.offset_bits - self.index_bits
    }
}

/// Convenience wrapper over [`Geometry::decompose`] for one-off decompositions
///
/// `set_count` of zero means the level is absent, and callers must not ask to decompose against it
pub fn decompose(address: u32, block_size: u32, set_count: u32) -> Decomposed {
    Geometry::new(block_size, set_count).decompose(address)
}
