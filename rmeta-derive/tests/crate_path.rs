mod custom {
    pub mod exports {
        pub use ::rmeta_core as rmeta_core;
    }
}

use rmeta_core::Reflect;

#[derive(Debug, Default, Clone, Copy, PartialEq, Reflect)]
#[reflect(crate_path = custom::exports::rmeta_core)]
struct Tagged {
    value: i32,
}

#[test]
fn derive_honors_a_custom_crate_path() {
    let t = Tagged { value: 9 };
    let mut buf = Vec::new();
    rmeta_core::write_binary(&mut buf, &t).unwrap();
    let back: Tagged = rmeta_core::read_binary(&mut &buf[..]).unwrap();
    assert_eq!(back, t);
}
