use std::ffi::CStr;

use ash::vk;
use mutate_macros::capability_blocks;

#[allow(dead_code)]
#[derive(Debug, PartialEq)]
enum FieldKind {
    StructureType,
    Pointer,
    Bool,
}

#[allow(dead_code)]
struct FieldDescriptor {
    kind: FieldKind,
    offset: usize,
    name: &'static str,
}

#[allow(dead_code)]
struct BlockSchema {
    id: vk::StructureType,
    name: &'static str,
    variant: &'static str,
    size: usize,
    chained: bool,
    extension: Option<&'static CStr>,
    promoted: Option<u32>,
    fields: &'static [FieldDescriptor],
}

capability_blocks! {
    /// Core toggles.
    head Core = vk::PhysicalDeviceFeatures [PHYSICAL_DEVICE_FEATURES_2] {
        robust_buffer_access,
        wide_lines,
    }

    #[extension(vk::KHR_SYNCHRONIZATION2_NAME)]
    #[promoted(1, 3)]
    Synchronization2 = vk::PhysicalDeviceSynchronization2Features<'static>
        [PHYSICAL_DEVICE_SYNCHRONIZATION_2_FEATURES] { synchronization2 }
}

fn main() {
    assert_eq!(SCHEMAS.len(), 2);
    assert_eq!(SCHEMAS[0].name, "VkPhysicalDeviceFeatures");
    assert_eq!(SCHEMAS[1].fields[0].kind, FieldKind::StructureType);
    assert_eq!(SCHEMAS[1].fields[2].name, "synchronization2");
    assert_eq!(HEAD_BLOCK, vk::StructureType::PHYSICAL_DEVICE_FEATURES_2);

    let mut block = Block::new(vk::StructureType::PHYSICAL_DEVICE_SYNCHRONIZATION_2_FEATURES).unwrap();
    assert_eq!(block.flag(2), Some(false));
    assert!(block.set_flag(2, true));
    assert_eq!(block.flag(2), Some(true));
    assert!(!block.set_flag(0, true));
    assert_eq!(block.flag(1), None);

    let core = Block::new(vk::StructureType::PHYSICAL_DEVICE_FEATURES_2).unwrap();
    assert_eq!(core.schema().fields.len(), 2);
    assert!(Block::new(vk::StructureType::APPLICATION_INFO).is_none());
}
