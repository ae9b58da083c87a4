use rmeta_core::{descriptor_of, read_binary, write_binary, Category, Reflect};

#[derive(Debug, Default, Clone, Copy, PartialEq, Reflect)]
struct Point {
    x: f64,
    y: f64,
}

#[test]
fn flat_record_round_trips() {
    let p = Point { x: 1.0, y: -2.5 };
    let mut buf = Vec::new();
    write_binary(&mut buf, &p).unwrap();
    let back: Point = read_binary(&mut &buf[..]).unwrap();
    assert_eq!(back, p);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Reflect)]
struct Entity {
    id: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Reflect)]
#[reflect(name = "Circle", version = 1)]
struct Circle {
    #[reflect(base)]
    entity: Entity,
    radius: f64,
    #[reflect(since = 1, condition = has_label)]
    label: String,
}

fn has_label(bytes: &[u8]) -> bool {
    let d = descriptor_of::<Circle>();
    let Category::Record(ops) = &d.category else {
        unreachable!()
    };
    let info = (ops.info)(ops.current_version);
    let member = info
        .members
        .iter()
        .find(|m| m.name == "label")
        .expect("label member");
    let start = member.offset;
    let end = start + std::mem::size_of::<String>();
    !(member.is_default)(&bytes[start..end])
}

#[test]
fn record_with_base_and_conditional_member_round_trips() {
    let c = Circle {
        entity: Entity { id: 7 },
        radius: 3.0,
        label: "unit".to_string(),
    };
    let mut buf = Vec::new();
    write_binary(&mut buf, &c).unwrap();
    let back: Circle = read_binary(&mut &buf[..]).unwrap();
    assert_eq!(back, c);
}

#[test]
fn record_with_base_and_empty_label_round_trips() {
    let c = Circle {
        entity: Entity { id: 1 },
        radius: 2.0,
        label: String::new(),
    };
    let mut buf = Vec::new();
    write_binary(&mut buf, &c).unwrap();
    let back: Circle = read_binary(&mut &buf[..]).unwrap();
    assert_eq!(back, c);
}

#[test]
fn base_offset_is_flattened_ahead_of_own_members() {
    let d = descriptor_of::<Circle>();
    let headers = rmeta_core::member::current_headers(d);
    let flat = rmeta_core::member::all_members(d, &headers);
    let names: Vec<&str> = flat.iter().map(|fm| fm.member.name).collect();
    assert_eq!(names, ["id", "radius", "label"]);
}
