// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Queue
//!
//! All Vulkan devices must expose at least a graphics capable queue and may expose dedicated
//! transfer and compute queues.  We always hand out all three roles.  When there is no dedicated
//! family for compute or transfer, the role takes another queue from the graphics family.  If that
//! family is out of queues, the adapter can't be used.
//!
//! Priorities are a scheduling hint only: graphics 1.0, compute 0.5, transfer 0.0.

use std::fmt;

use ash::{prelude::VkResult, vk};
use smallvec::SmallVec;

use crate::runtime::QueueFamily;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueRole {
    Graphics,
    Compute,
    Transfer,
}

impl QueueRole {
    pub const ALL: [QueueRole; 3] = [QueueRole::Graphics, QueueRole::Compute, QueueRole::Transfer];

    pub fn priority(self) -> f32 {
        match self {
            QueueRole::Graphics => 1.0,
            QueueRole::Compute => 0.5,
            QueueRole::Transfer => 0.0,
        }
    }
}

impl fmt::Display for QueueRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            QueueRole::Graphics => "graphics",
            QueueRole::Compute => "compute",
            QueueRole::Transfer => "transfer",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueueAssignment {
    pub role: QueueRole,
    pub family: u32,
    /// Index within the family.
    pub index: u32,
    pub priority: f32,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("no queue family can serve the {0} role")]
    NoFamily(QueueRole),

    #[error("presentation support query failed: {0}")]
    Presentation(vk::Result),
}

/// Who gets which queue, plus the priorities each family is created with.  Every role is always
/// assigned.
#[derive(Clone, Debug)]
pub struct QueuePlan {
    graphics: QueueAssignment,
    compute: QueueAssignment,
    transfer: QueueAssignment,
    /// One entry per family, priorities in queue index order.
    families: Vec<(u32, SmallVec<f32, 3>)>,
}

/// Queues handed out so far, per family.
#[derive(Default)]
struct Claims(Vec<(u32, SmallVec<f32, 3>)>);

impl Claims {
    fn claimed(&self, family: u32) -> u32 {
        self.0
            .iter()
            .find(|(f, _)| *f == family)
            .map_or(0, |(_, p)| p.len() as u32)
    }

    fn claim(&mut self, role: QueueRole, family: u32) -> QueueAssignment {
        let priority = role.priority();
        let index = match self.0.iter_mut().find(|(f, _)| *f == family) {
            Some((_, priorities)) => {
                priorities.push(priority);
                priorities.len() as u32 - 1
            }
            None => {
                let mut priorities = SmallVec::new();
                priorities.push(priority);
                self.0.push((family, priorities));
                0
            }
        };
        QueueAssignment {
            role,
            family,
            index,
            priority,
        }
    }
}

impl QueuePlan {
    /// Assign every role over `families`.
    ///
    /// `presents` answers whether a family can present to the target surface.  Headless callers
    /// answer yes.
    pub fn assign(
        families: &[QueueFamily],
        mut presents: impl FnMut(u32) -> VkResult<bool>,
    ) -> Result<Self, QueueError> {
        let mut graphics_family = None;
        for (i, family) in families.iter().enumerate() {
            let i = i as u32;
            if family
                .flags
                .contains(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
                && presents(i).map_err(QueueError::Presentation)?
            {
                graphics_family = Some(i);
                break;
            }
        }
        let graphics_family = graphics_family.ok_or(QueueError::NoFamily(QueueRole::Graphics))?;

        let mut claims = Claims::default();
        let graphics = claims.claim(QueueRole::Graphics, graphics_family);

        // An isolated family first, then a spare queue next to graphics.
        let mut dedicated = |role, want: vk::QueueFlags, exclude: vk::QueueFlags| {
            let isolated = families.iter().enumerate().position(|(i, f)| {
                f.flags.contains(want)
                    && !f.flags.intersects(exclude)
                    && f.count > claims.claimed(i as u32)
            });
            match isolated {
                Some(i) => Ok(claims.claim(role, i as u32)),
                None if families[graphics_family as usize].count
                    > claims.claimed(graphics_family) =>
                {
                    Ok(claims.claim(role, graphics_family))
                }
                None => Err(QueueError::NoFamily(role)),
            }
        };
        let compute = dedicated(
            QueueRole::Compute,
            vk::QueueFlags::COMPUTE,
            vk::QueueFlags::GRAPHICS,
        )?;
        let transfer = dedicated(
            QueueRole::Transfer,
            vk::QueueFlags::TRANSFER,
            vk::QueueFlags::COMPUTE | vk::QueueFlags::GRAPHICS,
        )?;

        Ok(QueuePlan {
            graphics,
            compute,
            transfer,
            families: claims.0,
        })
    }

    /// Graphics, compute and transfer, in that order.
    pub fn assignments(&self) -> [QueueAssignment; 3] {
        [self.graphics, self.compute, self.transfer]
    }

    pub fn assignment(&self, role: QueueRole) -> QueueAssignment {
        match role {
            QueueRole::Graphics => self.graphics,
            QueueRole::Compute => self.compute,
            QueueRole::Transfer => self.transfer,
        }
    }

    /// One create info per family.  They borrow the priorities from `self`.
    pub fn create_infos(&self) -> Vec<vk::DeviceQueueCreateInfo<'_>> {
        self.families
            .iter()
            .map(|(family, priorities)| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(*family)
                    .queue_priorities(priorities)
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Queue {
    pub queue: vk::Queue,
    pub family: u32,
    pub index: u32,
}

/// Queue handles retrieved after device creation.
#[derive(Clone, Copy, Debug)]
pub struct Queues {
    graphics: Queue,
    compute: Queue,
    transfer: Queue,
}

impl Queues {
    /// Fetch the handles named by a plan that `device` was created from.
    pub fn new(device: &ash::Device, plan: &QueuePlan) -> Self {
        let fetch = |role| {
            let a = plan.assignment(role);
            Queue {
                queue: unsafe { device.get_device_queue(a.family, a.index) },
                family: a.family,
                index: a.index,
            }
        };
        Queues {
            graphics: fetch(QueueRole::Graphics),
            compute: fetch(QueueRole::Compute),
            transfer: fetch(QueueRole::Transfer),
        }
    }

    pub fn graphics(&self) -> Queue {
        self.graphics
    }

    pub fn compute(&self) -> Queue {
        self.compute
    }

    pub fn transfer(&self) -> Queue {
        self.transfer
    }

    /// XXX Surface creation wants this.  Swapchains with exclusive sharing only work when the
    /// presenting queue is the graphics queue.
    pub fn graphics_family_index(&self) -> u32 {
        self.graphics.family
    }
}
