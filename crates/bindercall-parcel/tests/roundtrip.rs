use bindercall_parcel::{Arg, ParcelDialect, ParcelReader, ParcelWriter, Value};
use proptest::prelude::*;

/// Read back a value of the same variant as `like`.
fn read_like(reader: &mut ParcelReader, like: &Arg) -> Arg {
    match like {
        Arg::Byte(_) => Arg::Byte(reader.read_byte().unwrap()),
        Arg::Int(_) => Arg::Int(reader.read_i32().unwrap()),
        Arg::Long(_) => Arg::Long(reader.read_i64().unwrap()),
        Arg::Float(_) => Arg::Float(reader.read_f32().unwrap()),
        Arg::Double(_) => Arg::Double(reader.read_f64().unwrap()),
        Arg::String(_) => Arg::String(reader.read_string16().unwrap()),
        Arg::BooleanArray(_) => Arg::BooleanArray(reader.read_boolean_array().unwrap()),
        Arg::ByteArray(_) => Arg::ByteArray(reader.read_byte_array().unwrap()),
        Arg::CharArray(_) => Arg::CharArray(reader.read_char_array().unwrap()),
        Arg::IntArray(_) => Arg::IntArray(reader.read_int_array().unwrap()),
        Arg::LongArray(_) => Arg::LongArray(reader.read_long_array().unwrap()),
        Arg::DoubleArray(_) => Arg::DoubleArray(reader.read_double_array().unwrap()),
        Arg::Bundle(_) => Arg::Bundle(reader.read_bundle().unwrap()),
        Arg::Map(_) => Arg::Map(reader.read_map().unwrap()),
        Arg::List(_) => Arg::List(reader.read_value_list().unwrap()),
        Arg::Array(_) => Arg::Array(reader.read_value_list().unwrap()),
        Arg::Binder(_) => Arg::Binder(reader.read_binder().unwrap()),
        Arg::Value(_) => Arg::Value(reader.read_value().unwrap()),
    }
}

fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        ".{0,12}".prop_map(Value::String),
        any::<i32>().prop_map(Value::Int),
        any::<i16>().prop_map(Value::Short),
        any::<i64>().prop_map(Value::Long),
        (-1.0e6f32..1.0e6).prop_map(Value::Float),
        (-1.0e12f64..1.0e12).prop_map(Value::Double),
        any::<bool>().prop_map(Value::Bool),
        any::<i8>().prop_map(Value::Byte),
        proptest::collection::vec(any::<u8>(), 0..9).prop_map(Value::ByteArray),
        proptest::collection::vec(proptest::option::of(".{0,4}"), 0..4)
            .prop_map(Value::StringArray),
        proptest::collection::vec(any::<i32>(), 0..4).prop_map(Value::IntArray),
        proptest::collection::vec(any::<i64>(), 0..4).prop_map(Value::LongArray),
        proptest::collection::vec(any::<bool>(), 0..4).prop_map(Value::BooleanArray),
        proptest::collection::vec(-1.0e9f64..1.0e9, 0..4).prop_map(Value::DoubleArray),
        Just(Value::NullBinder),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar_value().prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::ObjectArray),
            proptest::collection::vec((inner.clone(), inner.clone()), 0..3).prop_map(Value::Map),
            proptest::collection::vec(("[a-z]{1,6}", inner), 0..3).prop_map(Value::Bundle),
        ]
    })
}

fn arg() -> impl Strategy<Value = Arg> {
    prop_oneof![
        any::<i8>().prop_map(Arg::Byte),
        any::<i32>().prop_map(Arg::Int),
        any::<i64>().prop_map(Arg::Long),
        (-1.0e6f32..1.0e6).prop_map(Arg::Float),
        (-1.0e12f64..1.0e12).prop_map(Arg::Double),
        proptest::option::of(".{0,16}").prop_map(Arg::String),
        proptest::option::of(proptest::collection::vec(any::<bool>(), 0..6))
            .prop_map(Arg::BooleanArray),
        proptest::option::of(proptest::collection::vec(any::<u8>(), 0..11)).prop_map(Arg::ByteArray),
        proptest::option::of(proptest::collection::vec(any::<u16>(), 0..6)).prop_map(Arg::CharArray),
        proptest::option::of(proptest::collection::vec(any::<i32>(), 0..6)).prop_map(Arg::IntArray),
        proptest::option::of(proptest::collection::vec(any::<i64>(), 0..6)).prop_map(Arg::LongArray),
        proptest::option::of(proptest::collection::vec(-1.0e9f64..1.0e9, 0..6))
            .prop_map(Arg::DoubleArray),
        proptest::option::of(proptest::collection::vec(("[a-z]{1,6}", value()), 1..4))
            .prop_map(Arg::Bundle),
        proptest::option::of(proptest::collection::vec((value(), value()), 0..3)).prop_map(Arg::Map),
        proptest::option::of(proptest::collection::vec(value(), 0..4)).prop_map(Arg::List),
        proptest::option::of(proptest::collection::vec(value(), 0..4)).prop_map(Arg::Array),
        Just(Arg::Binder(None)),
        value().prop_map(Arg::Value),
    ]
}

proptest! {
    #[test]
    fn args_roundtrip(args in proptest::collection::vec(arg(), 0..6), sdk in prop_oneof![Just(23u32), Just(29), Just(30), Just(33)]) {
        let dialect = ParcelDialect::new(sdk);
        let payload = bindercall_parcel::encode_call(dialect, "android.os.IFoo", &args).unwrap();
        prop_assert_eq!(payload.len() % 4, 0);

        let mut reader = ParcelReader::with_dialect(payload, dialect);
        let token = reader.read_interface_token().unwrap();
        prop_assert_eq!(token.as_deref(), Some("android.os.IFoo"));
        for arg in &args {
            let decoded = read_like(&mut reader, arg);
            prop_assert_eq!(&decoded, arg);
        }
        prop_assert_eq!(reader.remaining(), 0);
    }
}

#[test]
fn empty_bundle_reads_back_empty() {
    let mut writer = ParcelWriter::new();
    writer.write_arg(&Arg::Bundle(Some(Vec::new()))).unwrap();
    let mut reader = ParcelReader::new(writer.into_bytes());
    assert_eq!(reader.read_bundle().unwrap(), Some(Vec::new()));
}
