use rmeta_core::{descriptor_of, read_binary, write_binary, Category, Reflect};

#[derive(Debug, Default, Clone, Copy, PartialEq, Reflect)]
enum Color {
    #[default]
    Red,
    Green = 5,
    Blue,
}

#[test]
fn enum_discriminants_follow_explicit_and_implicit_values() {
    let d = descriptor_of::<Color>();
    let Category::Enum(ops) = &d.category else {
        panic!("expected Category::Enum")
    };
    assert_eq!(
        ops.variants,
        &[(0, "Red"), (5, "Green"), (6, "Blue")]
    );
}

#[test]
fn enum_round_trips_through_binary_codec() {
    for c in [Color::Red, Color::Green, Color::Blue] {
        let mut buf = Vec::new();
        write_binary(&mut buf, &c).unwrap();
        let back: Color = read_binary(&mut &buf[..]).unwrap();
        assert_eq!(back, c);
    }
}

#[test]
fn unknown_discriminant_falls_back_to_default_on_read() {
    let d = descriptor_of::<Color>();
    let Category::Enum(ops) = &d.category else {
        panic!("expected Category::Enum")
    };
    let mut c = Color::Blue;
    let bytes = unsafe {
        std::slice::from_raw_parts_mut((&mut c as *mut Color).cast::<u8>(), d.size)
    };
    (ops.from_int)(bytes, 42);
    assert_eq!(c, Color::default());
}
