// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Capability Chain
//!
//! An ordered set of feature blocks behind a fixed head block.  This is what Vulkan wants in
//! `VkPhysicalDeviceFeatures2::pNext`, except we don't keep the pointers around.  Blocks sit in an
//! arena whose order is the link order, and `p_next` only gets written while a call is in flight.
//! See [`CapabilityChain::with_features2`].
//!
//! No two blocks ever share an identifier.  The head identifier always resolves to the head.

use std::{ffi::c_void, fmt, ptr};

use ash::vk;

use crate::registry::{Block, HEAD_BLOCK};

#[derive(Clone, Debug)]
pub struct CapabilityChain {
    /// Always `Block::Core`.
    head: Block,
    blocks: Vec<Block>,
}

impl Default for CapabilityChain {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityChain {
    pub fn new() -> Self {
        Self {
            head: Block::Core(vk::PhysicalDeviceFeatures::default()),
            blocks: Vec::new(),
        }
    }

    /// Drop every chained block and zero the head.
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.head = Block::Core(vk::PhysicalDeviceFeatures::default());
    }

    /// Chained blocks, not counting the head.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, id: vk::StructureType) -> bool {
        id == HEAD_BLOCK || self.position(id).is_some()
    }

    /// Identifiers of the chained blocks in link order.
    pub fn ids(&self) -> impl Iterator<Item = vk::StructureType> + '_ {
        self.blocks.iter().map(Block::id)
    }

    /// Head first, then link order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        std::iter::once(&self.head).chain(self.blocks.iter())
    }

    pub fn get(&self, id: vk::StructureType) -> Option<&Block> {
        if id == HEAD_BLOCK {
            Some(&self.head)
        } else {
            self.position(id).map(|i| &self.blocks[i])
        }
    }

    /// Read one flag.  `None` when the block is absent or the field is not a flag.
    pub fn flag(&self, id: vk::StructureType, field: usize) -> Option<bool> {
        self.get(id).and_then(|b| b.flag(field))
    }

    /// Append a zeroed block for `id` unless one exists.  Idempotent.
    ///
    /// Panics on identifiers the registry doesn't know.
    pub fn ensure_block(&mut self, id: vk::StructureType) -> &mut Block {
        if id == HEAD_BLOCK {
            return &mut self.head;
        }
        let index = match self.position(id) {
            Some(i) => i,
            None => {
                self.blocks.push(zeroed(id));
                self.blocks.len() - 1
            }
        };
        &mut self.blocks[index]
    }

    /// Set every listed field of block `id` to true, adding the block if needed.
    ///
    /// Panics if an index is not a flag of that block.
    pub fn set_flags(&mut self, id: vk::StructureType, fields: &[usize]) {
        let block = self.ensure_block(id);
        for &field in fields {
            write_flag(block, field, true);
        }
    }

    /// Write one flag, adding the block if needed.  Panics on non-flag fields.
    pub fn set_flag(&mut self, id: vk::StructureType, field: usize, value: bool) {
        write_flag(self.ensure_block(id), field, value);
    }

    /// Reshape `self` to hold exactly the blocks of `other`, in `other`'s order.
    ///
    /// Blocks present in both keep their data.  Blocks only `self` had are dropped.  Afterwards the
    /// two chains can be walked in lockstep.
    pub fn mirror_shape(&mut self, other: &CapabilityChain) {
        let mut old = std::mem::take(&mut self.blocks);
        self.blocks = other
            .blocks
            .iter()
            .map(|b| {
                let id = b.id();
                match old.iter().position(|o| o.id() == id) {
                    Some(i) => old.swap_remove(i),
                    None => zeroed(id),
                }
            })
            .collect();
    }

    /// Link the chain behind a [`vk::PhysicalDeviceFeatures2`] for the duration of `f`.
    ///
    /// Anything the callee writes lands back in the chain.  The links are cleared before this
    /// returns, so the chain never holds dangling `p_next` values.
    pub fn with_features2<R>(
        &mut self,
        f: impl FnOnce(&mut vk::PhysicalDeviceFeatures2<'_>) -> R,
    ) -> R {
        let mut next: *mut c_void = ptr::null_mut();
        for block in self.blocks.iter_mut().rev() {
            block.set_next(next);
            next = block.as_mut_ptr();
        }

        let features = match self.head {
            Block::Core(features) => features,
            _ => unreachable!("chain head is always the core block"),
        };
        let mut features2 = vk::PhysicalDeviceFeatures2 {
            p_next: next,
            features,
            ..Default::default()
        };
        let out = f(&mut features2);

        self.head = Block::Core(features2.features);
        for block in &mut self.blocks {
            block.set_next(ptr::null_mut());
        }
        out
    }

    /// Human readable nesting of enabled flags, grouped by block.  Blocks without any enabled flag
    /// are left out.
    pub fn render(&self) -> String {
        self.to_string()
    }

    fn position(&self, id: vk::StructureType) -> Option<usize> {
        self.blocks.iter().position(|b| b.id() == id)
    }
}

fn zeroed(id: vk::StructureType) -> Block {
    match Block::new(id) {
        Some(block) => block,
        None => panic!("no capability schema for {id:?}, the registry is behind the Vulkan catalogue"),
    }
}

fn write_flag(block: &mut Block, field: usize, value: bool) {
    if !block.set_flag(field, value) {
        let schema = block.schema();
        let name = schema.fields.get(field).map_or("<out of range>", |f| f.name);
        panic!("{}.{name} (field {field}) is not a flag", schema.name);
    }
}

impl fmt::Display for CapabilityChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut first_block = true;
        for block in self.blocks() {
            let schema = block.schema();
            let mut enabled = schema
                .flags()
                .filter(|(i, _)| block.flag(*i) == Some(true))
                .peekable();
            if enabled.peek().is_none() {
                continue;
            }
            if !first_block {
                f.write_str(",")?;
            }
            first_block = false;
            write!(f, "\"{}\":{{", schema.name)?;
            for (n, (_, field)) in enabled.enumerate() {
                if n > 0 {
                    f.write_str(",")?;
                }
                write!(f, "\"{}\": true", field.name)?;
            }
            f.write_str("}")?;
        }
        f.write_str("}")
    }
}
