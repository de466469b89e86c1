//! OpenCL device enumeration, identity and scoring

use crate::error::Result;
use ocl::core::ClDeviceIdPtr;
use ocl::enums::{DeviceInfo, DeviceInfoResult};
use ocl::ffi::{self, cl_device_info, cl_uint};
use ocl::{Device, Platform};
use std::mem::size_of;
use std::os::raw::c_void;

/// AMD device attribute query: PCIe topology
const CL_DEVICE_TOPOLOGY_AMD: cl_device_info = 0x4037;

/// Topology type discriminant for PCIe
const CL_DEVICE_TOPOLOGY_TYPE_PCIE_AMD: cl_uint = 1;

/// NVIDIA device attribute queries: PCI bus and slot
const CL_DEVICE_PCI_BUS_ID_NV: cl_device_info = 0x4008;
const CL_DEVICE_PCI_SLOT_ID_NV: cl_device_info = 0x4009;

/// Typed accessors over the raw device info queries this crate needs
pub trait DeviceExt {
    /// Space-separated extension list
    fn extensions(&self) -> Result<String>;

    /// Preferred native vector width for `char` elements
    fn preferred_vector_width_char(&self) -> Result<u32>;

    /// Maximum number of parallel compute units
    fn max_compute_units(&self) -> Result<u32>;

    /// Maximum clock frequency in MHz
    fn max_clock_frequency(&self) -> Result<u32>;

    /// Maximum work item count per dimension
    fn max_work_item_sizes(&self) -> Result<Vec<usize>>;
}

impl DeviceExt for Device {
    fn extensions(&self) -> Result<String> {
        match self.info(DeviceInfo::Extensions)? {
            DeviceInfoResult::Extensions(extensions) => Ok(extensions),
            other => Ok(other.to_string()),
        }
    }

    fn preferred_vector_width_char(&self) -> Result<u32> {
        match self.info(DeviceInfo::PreferredVectorWidthChar)? {
            DeviceInfoResult::PreferredVectorWidthChar(width) => Ok(width),
            _ => Ok(1),
        }
    }

    fn max_compute_units(&self) -> Result<u32> {
        match self.info(DeviceInfo::MaxComputeUnits)? {
            DeviceInfoResult::MaxComputeUnits(units) => Ok(units),
            _ => Ok(1),
        }
    }

    fn max_clock_frequency(&self) -> Result<u32> {
        match self.info(DeviceInfo::MaxClockFrequency)? {
            DeviceInfoResult::MaxClockFrequency(freq) => Ok(freq),
            _ => Ok(1),
        }
    }

    fn max_work_item_sizes(&self) -> Result<Vec<usize>> {
        match self.info(DeviceInfo::MaxWorkItemSizes)? {
            DeviceInfoResult::MaxWorkItemSizes(sizes) => Ok(sizes),
            _ => Ok(vec![1]),
        }
    }
}

/// All OpenCL devices across all platforms
pub fn all_devices() -> Result<Vec<Device>> {
    let mut devices = Vec::new();

    for platform in Platform::list() {
        devices.extend(Device::list_all(platform)?);
    }

    Ok(devices)
}

/// Heuristic device score: compute units × clock frequency × preferred char
/// vector width. Higher is better.
pub fn score_device(device: &Device) -> Result<u64> {
    Ok(device.max_compute_units()? as u64
        * device.max_clock_frequency()? as u64
        * device.preferred_vector_width_char()? as u64)
}

/// Read a fixed-size device info value through the raw OpenCL API.
///
/// Used for vendor-specific parameters the portable enums do not cover.
fn raw_device_info<T: Copy>(device: &Device, param: cl_device_info, zero: T) -> Option<T> {
    let mut value = zero;

    let status = unsafe {
        ffi::clGetDeviceInfo(
            device.as_ptr(),
            param,
            size_of::<T>(),
            &mut value as *mut T as *mut c_void,
            std::ptr::null_mut(),
        )
    };

    (status == 0).then_some(value)
}

/// Layout of the AMD PCIe topology union, PCIe variant
#[repr(C)]
#[derive(Clone, Copy)]
struct TopologyAmd {
    topology_type: cl_uint,
    unused: [u8; 17],
    bus: u8,
    device: u8,
    function: u8,
}

/// A stable identifier for a device, derived from its PCIe topology.
///
/// Uses the AMD or NVIDIA device attribute query extensions; returns `None`
/// when neither is available. Formatted as `PCIE:BB:DD.F`.
pub fn unique_id(device: &Device) -> Option<String> {
    let extensions = device.extensions().ok()?;

    if extensions.contains("cl_amd_device_attribute_query") {
        let zero = TopologyAmd {
            topology_type: 0,
            unused: [0; 17],
            bus: 0,
            device: 0,
            function: 0,
        };
        let topology = raw_device_info(device, CL_DEVICE_TOPOLOGY_AMD, zero)?;

        if topology.topology_type == CL_DEVICE_TOPOLOGY_TYPE_PCIE_AMD {
            return Some(format!(
                "PCIE:{:02x}:{:02x}.{}",
                topology.bus, topology.device, topology.function
            ));
        }

        None
    } else if extensions.contains("cl_nv_device_attribute_query") {
        let bus: cl_uint = raw_device_info(device, CL_DEVICE_PCI_BUS_ID_NV, 0)?;
        let slot: cl_uint = raw_device_info(device, CL_DEVICE_PCI_SLOT_ID_NV, 0)?;

        Some(format!("PCIE:{:02x}:{:02x}.0", bus as u8, slot as u8))
    } else {
        None
    }
}
