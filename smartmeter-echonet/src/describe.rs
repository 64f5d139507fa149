//! Human-readable rendering of property values
//!
//! A lookup table of decoders keyed by (object class, property code). It is
//! independent of the frame codec: decoders only see one property's EDT.
//! Unknown properties, and payloads too short for their decoder, fall back
//! to `EPC=0xNN: <hex>`.

use crate::frame::{EchonetObject, Frame};
use crate::property::{Property, PropertyCode, node_profile, smart_meter};
use once_cell::sync::Lazy;
use std::collections::HashMap;

type Describer = fn(&Property) -> Option<String>;

static DESCRIBERS: Lazy<HashMap<(EchonetObject, PropertyCode), Describer>> = Lazy::new(|| {
    let node = EchonetObject::NODE_PROFILE;
    let meter = EchonetObject::LV_SMART_ELECTRIC_ENERGY_METER;
    let entries: [((EchonetObject, PropertyCode), Describer); 11] = [
        ((node, node_profile::VERSION_INFORMATION), version_information),
        ((node, node_profile::MANUFACTURER_CODE), manufacturer_code),
        ((node, node_profile::SELF_NODE_INSTANCE_LIST_S), self_node_instance_list),
        ((meter, smart_meter::COEFFICIENT), coefficient),
        ((meter, smart_meter::UNIT_FOR_CUMULATIVE_ENERGY), unit_for_cumulative_energy),
        ((meter, smart_meter::NORMAL_DIRECTION_CUMULATIVE_ENERGY), cumulative_energy),
        ((meter, smart_meter::REVERSE_DIRECTION_CUMULATIVE_ENERGY), cumulative_energy),
        ((meter, smart_meter::INSTANTANEOUS_ELECTRIC_POWER), instantaneous_power),
        ((meter, smart_meter::INSTANTANEOUS_CURRENT), instantaneous_current),
        ((meter, smart_meter::NORMAL_DIRECTION_CUMULATIVE_ENERGY_FIXED_TIME), cumulative_energy_fixed_time),
        ((meter, smart_meter::REVERSE_DIRECTION_CUMULATIVE_ENERGY_FIXED_TIME), cumulative_energy_fixed_time),
    ];
    entries.into_iter().collect()
});

/// Describe one property of an object of class `object`
pub fn describe(object: EchonetObject, property: &Property) -> String {
    DESCRIBERS
        .get(&(object, property.epc()))
        .and_then(|describer| describer(property))
        .unwrap_or_else(|| raw(property))
}

/// Describe every property of a response, using its source object as class
pub fn describe_frame(frame: &Frame) -> Vec<String> {
    frame
        .properties()
        .iter()
        .map(|p| describe(frame.seoj(), p))
        .collect()
}

fn raw(p: &Property) -> String {
    format!("EPC={}: {}", p.epc(), hex::encode_upper(p.edt()))
}

fn be_u16(b: &[u8]) -> Option<u16> {
    Some(u16::from_be_bytes(b.get(..2)?.try_into().ok()?))
}

fn be_u32(b: &[u8]) -> Option<u32> {
    Some(u32::from_be_bytes(b.get(..4)?.try_into().ok()?))
}

fn be_u24(b: &[u8]) -> Option<u32> {
    let b = b.get(..3)?;
    Some(u32::from_be_bytes([0, b[0], b[1], b[2]]))
}

fn direction(p: &Property) -> &'static str {
    match p.epc() {
        smart_meter::REVERSE_DIRECTION_CUMULATIVE_ENERGY
        | smart_meter::REVERSE_DIRECTION_CUMULATIVE_ENERGY_FIXED_TIME => "reverse",
        _ => "normal",
    }
}

fn version_information(p: &Property) -> Option<String> {
    let edt = p.edt().get(..2)?;
    Some(format!("Version information: {}.{}", edt[0], edt[1]))
}

fn manufacturer_code(p: &Property) -> Option<String> {
    Some(format!("Manufacturer code: 0x{:06X}", be_u24(p.edt())?))
}

fn self_node_instance_list(p: &Property) -> Option<String> {
    let (&count, rest) = p.edt().split_first()?;
    let instances = rest
        .chunks_exact(3)
        .take(count as usize)
        .map(|eoj| be_u24(eoj).map(|code| format!("0x{:06X}", code)))
        .collect::<Option<Vec<_>>>()?;
    if instances.len() != count as usize {
        return None;
    }
    Some(format!("Self node instance list: [{}]", instances.join(", ")))
}

fn coefficient(p: &Property) -> Option<String> {
    Some(format!("Coefficient: {}", be_u32(p.edt())?))
}

fn unit_for_cumulative_energy(p: &Property) -> Option<String> {
    let unit = match *p.edt().first()? {
        0x00 => 1.0,
        0x01 => 0.1,
        0x02 => 0.01,
        0x03 => 0.001,
        0x04 => 0.0001,
        0x0A => 10.0,
        0x0B => 100.0,
        0x0C => 1000.0,
        0x0D => 10000.0,
        _ => return None,
    };
    Some(format!("Unit for cumulative amounts of electric energy: {} [kWh]", unit))
}

/// Scaled by the 0.1 kWh unit most meters report through 0xE1
fn cumulative_energy(p: &Property) -> Option<String> {
    let value = be_u32(p.edt())?;
    Some(format!(
        "Cumulative electric energy ({} direction): {:.1} [kWh]",
        direction(p),
        f64::from(value) / 10.0
    ))
}

fn instantaneous_power(p: &Property) -> Option<String> {
    let watts = be_u32(p.edt())? as i32;
    Some(format!("Instantaneous electric power: {} [W]", watts))
}

fn instantaneous_current(p: &Property) -> Option<String> {
    let edt = p.edt();
    let r_phase = be_u16(edt)? as i16;
    let t_phase = be_u16(edt.get(2..)?)? as i16;
    Some(format!(
        "Instantaneous current: R-phase {:.1} [A], T-phase {:.1} [A]",
        f64::from(r_phase) / 10.0,
        f64::from(t_phase) / 10.0
    ))
}

fn cumulative_energy_fixed_time(p: &Property) -> Option<String> {
    let edt = p.edt();
    let year = be_u16(edt)?;
    let stamp = edt.get(2..7)?;
    let value = be_u32(edt.get(7..)?)?;
    Some(format!(
        "Cumulative electric energy ({:04}-{:02}-{:02} {:02}:{:02}:{:02}, {} direction): {:.1} [kWh]",
        year,
        stamp[0],
        stamp[1],
        stamp[2],
        stamp[3],
        stamp[4],
        direction(p),
        f64::from(value) / 10.0
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const METER: EchonetObject = EchonetObject::LV_SMART_ELECTRIC_ENERGY_METER;

    fn prop(epc: PropertyCode, edt: &[u8]) -> Property {
        Property::new(epc, edt.to_vec()).unwrap()
    }

    #[test]
    fn test_instantaneous_power() {
        let p = prop(smart_meter::INSTANTANEOUS_ELECTRIC_POWER, &[0x00, 0x00, 0x01, 0x2C]);
        assert_eq!(describe(METER, &p), "Instantaneous electric power: 300 [W]");
    }

    #[test]
    fn test_instantaneous_current() {
        let p = prop(smart_meter::INSTANTANEOUS_CURRENT, &[0x00, 0x14, 0x00, 0x64]);
        assert_eq!(
            describe(METER, &p),
            "Instantaneous current: R-phase 2.0 [A], T-phase 10.0 [A]"
        );
    }

    #[test]
    fn test_unit_and_coefficient() {
        let p = prop(smart_meter::UNIT_FOR_CUMULATIVE_ENERGY, &[0x01]);
        assert_eq!(
            describe(METER, &p),
            "Unit for cumulative amounts of electric energy: 0.1 [kWh]"
        );
        let p = prop(smart_meter::COEFFICIENT, &[0, 0, 0, 1]);
        assert_eq!(describe(METER, &p), "Coefficient: 1");
    }

    #[test]
    fn test_fixed_time_energy() {
        let p = prop(
            smart_meter::REVERSE_DIRECTION_CUMULATIVE_ENERGY_FIXED_TIME,
            &[0x07, 0xE8, 0x05, 0x01, 0x0C, 0x1E, 0x00, 0x00, 0x00, 0x30, 0x39],
        );
        assert_eq!(
            describe(METER, &p),
            "Cumulative electric energy (2024-05-01 12:30:00, reverse direction): 1234.5 [kWh]"
        );
    }

    #[test]
    fn test_node_profile() {
        let node = EchonetObject::NODE_PROFILE;
        let p = prop(node_profile::VERSION_INFORMATION, &[0x01, 0x0D, 0x01, 0x00]);
        assert_eq!(describe(node, &p), "Version information: 1.13");
        let p = prop(node_profile::SELF_NODE_INSTANCE_LIST_S, &[0x01, 0x02, 0x88, 0x01]);
        assert_eq!(describe(node, &p), "Self node instance list: [0x028801]");
    }

    #[test]
    fn test_same_code_depends_on_class() {
        // 0xD3 is the coefficient for a meter but an instance count for a node profile
        let p = prop(PropertyCode(0xD3), &[0, 0, 0, 1]);
        assert_eq!(describe(METER, &p), "Coefficient: 1");
        assert_eq!(describe(EchonetObject::NODE_PROFILE, &p), "EPC=0xD3: 00000001");
    }

    #[test]
    fn test_short_payload_falls_back() {
        let p = Property::request(smart_meter::INSTANTANEOUS_ELECTRIC_POWER);
        assert_eq!(describe(METER, &p), "EPC=0xE7: ");
        let p = prop(node_profile::SELF_NODE_INSTANCE_LIST_S, &[0x02, 0x02, 0x88, 0x01]);
        assert_eq!(
            describe(EchonetObject::NODE_PROFILE, &p),
            "EPC=0xD6: 02028801"
        );
    }
}
