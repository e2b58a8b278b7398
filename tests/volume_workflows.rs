//
// volume_workflows.rs
// Volume-Convert-rs
//
// Integration-style tests covering passthrough conversion, casting, compression, geometry, and each format backend.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs;
use std::path::{Path, PathBuf};

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use tempfile::{tempdir, TempDir};
use volume_convert::convert::{self, ConvertOptions};
use volume_convert::formats::{self, metaimage};
use volume_convert::pixel::{ComponentType, DataType, PixelType};
use volume_convert::{Geometry, Volume};

fn ramp_geometry() -> Geometry {
    Geometry {
        spacing: [0.5, 0.75, 2.0],
        origin: [-12.5, 3.0, 40.0],
        ..Geometry::default()
    }
}

fn build_short_volume(name: &str) -> (TempDir, PathBuf, Vec<i16>) {
    // A 6x5x4 ramp with negative values so signedness matters.
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(name);
    let samples: Vec<i16> = (0..120).map(|v| (v * 37 - 2000) as i16).collect();
    let volume =
        Volume::from_x_fastest([6, 5, 4], samples.clone(), ramp_geometry()).expect("volume");
    formats::write_volume(&path, &volume, false).expect("write fixture");
    (dir, path, samples)
}

fn options(input: &Path, output: &Path, data_type: Option<DataType>) -> ConvertOptions {
    ConvertOptions {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        data_type,
        unsigned: false,
        compress: false,
    }
}

fn build_test_dicom(dir: &Path, frames: &[[u8; 4]]) -> PathBuf {
    // Construct a tiny 2x2 Secondary Capture instance with predictable pixel values.
    let path = dir.join(format!("sample_{}.dcm", frames.len()));
    let number_of_frames = frames.len().to_string();
    let pixels: Vec<u8> = frames.iter().flatten().copied().collect();

    let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
    let elements = [
        (Tag(0x0008, 0x0016), VR::UI, PrimitiveValue::from("1.2.840.10008.5.1.4.1.1.7")),
        (Tag(0x0008, 0x0018), VR::UI, PrimitiveValue::from("1.2.826.0.1.3680043.2.1125.1")),
        (Tag(0x0008, 0x0060), VR::CS, PrimitiveValue::from("OT")),
        (Tag(0x0018, 0x0050), VR::DS, PrimitiveValue::from("3")), // Slice Thickness
        (Tag(0x0020, 0x0032), VR::DS, PrimitiveValue::from("-100\\-50\\25")), // Image Position
        (Tag(0x0028, 0x0002), VR::US, PrimitiveValue::from(1_u16)), // Samples per pixel
        (Tag(0x0028, 0x0004), VR::CS, PrimitiveValue::from("MONOCHROME2")),
        (Tag(0x0028, 0x0008), VR::IS, PrimitiveValue::from(number_of_frames.as_str())), // Number of Frames
        (Tag(0x0028, 0x0010), VR::US, PrimitiveValue::from(2_u16)), // Rows
        (Tag(0x0028, 0x0011), VR::US, PrimitiveValue::from(2_u16)), // Columns
        (Tag(0x0028, 0x0030), VR::DS, PrimitiveValue::from("0.5\\0.25")), // Pixel Spacing
        (Tag(0x0028, 0x0100), VR::US, PrimitiveValue::from(8_u16)), // Bits Allocated
        (Tag(0x0028, 0x0101), VR::US, PrimitiveValue::from(8_u16)), // Bits Stored
        (Tag(0x0028, 0x0102), VR::US, PrimitiveValue::from(7_u16)), // High Bit
        (Tag(0x0028, 0x0103), VR::US, PrimitiveValue::from(0_u16)), // Pixel Representation
        (Tag(0x0028, 0x1052), VR::DS, PrimitiveValue::from("-1024")), // Rescale Intercept
        (Tag(0x0028, 0x1053), VR::DS, PrimitiveValue::from("2")), // Rescale Slope
        (Tag(0x7fe0, 0x0010), VR::OB, PrimitiveValue::from(pixels)),
    ];
    for (tag, vr, value) in elements {
        obj.put(DataElement::new(tag, vr, value));
    }

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
        .media_storage_sop_instance_uid("1.2.826.0.1.3680043.2.1125.1")
        .build()
        .expect("meta");

    let mut file_obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
    for elem in obj {
        file_obj.put(elem);
    }
    file_obj.write_to_file(&path).expect("write test dicom");

    path
}

#[test]
fn short_to_short_is_bit_exact() {
    let (dir, input, samples) = build_short_volume("input.mha");
    let output = dir.path().join("output.mha");

    let summary =
        convert::run(&options(&input, &output, Some(DataType::Short))).expect("convert");
    assert_eq!(summary.pixel_type, PixelType::Short);
    assert_eq!(summary.dimensions, [6, 5, 4]);

    let restored = formats::read_volume::<i16>(&output).expect("read output");
    assert_eq!(restored.x_fastest().collect::<Vec<_>>(), samples);
    assert_eq!(restored.geometry, ramp_geometry());

    // Identical header and payload: the passthrough writes the same bytes.
    assert_eq!(fs::read(&input).unwrap(), fs::read(&output).unwrap());
}

#[test]
fn every_valid_type_combination_converts() {
    let (dir, input, _) = build_short_volume("input.mha");
    let cases = [
        (DataType::Short, false, ComponentType::I16),
        (DataType::Short, true, ComponentType::U16),
        (DataType::Int, false, ComponentType::I32),
        (DataType::Int, true, ComponentType::U32),
        (DataType::Float, false, ComponentType::F32),
    ];

    for (data_type, unsigned, expected) in cases {
        let output = dir.path().join(format!("{:?}_{}.mha", data_type, unsigned));
        let mut opts = options(&input, &output, Some(data_type));
        opts.unsigned = unsigned;

        convert::run(&opts).expect("convert");
        assert_eq!(metaimage::probe(&output).expect("probe"), expected);
    }

    // Unsigned targets saturate negative samples at zero.
    let unsigned = formats::read_volume::<u16>(&dir.path().join("Short_true.mha")).expect("read");
    assert_eq!(unsigned.data[[0, 0, 0]], 0);
    let float = formats::read_volume::<f32>(&dir.path().join("Float_false.mha")).expect("read");
    assert_eq!(float.data[[1, 0, 0]], -1963.0);
}

#[test]
fn unsigned_float_fails_without_output() {
    let (dir, input, _) = build_short_volume("input.mha");
    let output = dir.path().join("output.mha");
    let mut opts = options(&input, &output, Some(DataType::Float));
    opts.unsigned = true;

    assert!(convert::run(&opts).is_err());
    assert!(!output.exists());
}

#[test]
fn missing_input_fails_before_output_is_created() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("absent.mha");
    let output = dir.path().join("output.mha");

    assert!(convert::run(&options(&input, &output, Some(DataType::Short))).is_err());
    assert!(convert::run(&options(&input, &output, None)).is_err());
    assert!(!output.exists());
}

#[test]
fn compression_changes_bytes_but_not_voxels() {
    // Long runs of equal values, as in a mostly-background scan.
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("input.mha");
    let samples: Vec<i16> = (0..32 * 32 * 8).map(|v| (v / 64) as i16).collect();
    let volume = Volume::from_x_fastest([32, 32, 8], samples.clone(), ramp_geometry())
        .expect("volume");
    formats::write_volume(&input, &volume, false).expect("fixture");

    let plain = dir.path().join("plain.mha");
    let packed = dir.path().join("packed.mha");

    convert::run(&options(&input, &plain, Some(DataType::Short))).expect("plain");
    let mut opts = options(&input, &packed, Some(DataType::Short));
    opts.compress = true;
    let summary = convert::run(&opts).expect("compressed");
    assert!(summary.compressed);

    let plain_bytes = fs::read(&plain).unwrap();
    let packed_bytes = fs::read(&packed).unwrap();
    assert_ne!(plain_bytes, packed_bytes);
    assert!(packed_bytes.len() < plain_bytes.len());

    let restored = formats::read_volume::<i16>(&packed).expect("read compressed");
    assert_eq!(restored.x_fastest().collect::<Vec<_>>(), samples);
}

#[test]
fn omitted_datatype_keeps_native_type() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("bytes.mha");
    fs::write(
        &input,
        b"ObjectType = Image\nNDims = 3\nDimSize = 2 2 1\nElementType = MET_UCHAR\nElementDataFile = LOCAL\n\x00\x7f\x80\xff",
    )
    .unwrap();
    let output = dir.path().join("widened.mha");

    let summary = convert::run(&options(&input, &output, None)).expect("convert");
    assert_eq!(summary.pixel_type, PixelType::UnsignedShort);
    assert_eq!(metaimage::probe(&output).unwrap(), ComponentType::U16);

    let restored = formats::read_volume::<u16>(&output).expect("read");
    assert_eq!(restored.x_fastest().collect::<Vec<_>>(), vec![0, 127, 128, 255]);
}

#[test]
fn nifti_roundtrip_keeps_voxels_and_geometry() {
    let (dir, input, samples) = build_short_volume("input.mha");

    for name in ["volume.nii", "volume.nii.gz"] {
        let nifti = dir.path().join(name);
        let mut opts = options(&input, &nifti, Some(DataType::Short));
        opts.compress = name.ends_with(".gz");
        convert::run(&opts).expect("to nifti");

        assert_eq!(formats::probe(&nifti).expect("probe"), ComponentType::I16);
        let restored = formats::read_volume::<i16>(&nifti).expect("read nifti");
        assert_eq!(restored.dims(), [6, 5, 4]);
        assert_eq!(restored.x_fastest().collect::<Vec<_>>(), samples);
        assert_eq!(restored.geometry, ramp_geometry());
    }

    let plain = fs::read(dir.path().join("volume.nii")).unwrap();
    let gz = fs::read(dir.path().join("volume.nii.gz")).unwrap();
    assert!(gz.starts_with(&[0x1f, 0x8b]));
    assert!(gz.len() < plain.len());
}

#[test]
fn dicom_input_converts_with_rescale_and_spacing() {
    let dir = tempdir().expect("tempdir");
    let input = build_test_dicom(dir.path(), &[[0, 64, 128, 255]]);
    let output = dir.path().join("from_dicom.mha");

    // Integral rescale: stored as 8-bit, read back as signed short.
    assert_eq!(formats::probe(&input).expect("probe"), ComponentType::I16);
    let summary = convert::run(&options(&input, &output, None)).expect("convert");
    assert_eq!(summary.pixel_type, PixelType::Short);
    assert_eq!(summary.dimensions, [2, 2, 1]);

    let volume = formats::read_volume::<i16>(&output).expect("read");
    assert_eq!(
        volume.x_fastest().collect::<Vec<_>>(),
        vec![-1024, -896, -768, -514]
    );
    assert_eq!(volume.geometry.spacing, [0.25, 0.5, 3.0]);
    assert_eq!(volume.geometry.origin, [-100.0, -50.0, 25.0]);
}

#[test]
fn dicom_is_rejected_as_output() {
    let (dir, input, _) = build_short_volume("input.mha");
    let output = dir.path().join("output.dcm");

    let err = convert::run(&options(&input, &output, Some(DataType::Short))).unwrap_err();
    assert!(err.to_string().contains("DICOM"));
    assert!(!output.exists());
}

#[test]
fn png_slices_hold_unsigned_short_only() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("slice.mha");
    let samples: Vec<u16> = (0..12).map(|v| v * 5000).collect();
    let volume = Volume::from_x_fastest([4, 3, 1], samples.clone(), Geometry::default())
        .expect("volume");
    formats::write_volume(&input, &volume, false).expect("fixture");

    let png = dir.path().join("slice.png");
    let mut opts = options(&input, &png, Some(DataType::Short));
    opts.unsigned = true;
    opts.compress = true;
    convert::run(&opts).expect("to png");

    assert_eq!(formats::probe(&png).expect("probe"), ComponentType::U16);
    let restored = formats::read_volume::<u16>(&png).expect("read png");
    assert_eq!(restored.dims(), [4, 3, 1]);
    assert_eq!(restored.x_fastest().collect::<Vec<_>>(), samples);

    let float_png = dir.path().join("float.png");
    assert!(convert::run(&options(&input, &float_png, Some(DataType::Float))).is_err());
    assert!(!float_png.exists());
}

#[test]
fn eight_bit_png_keeps_its_values() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("gray8.png");
    image::GrayImage::from_raw(2, 1, vec![1, 200])
        .expect("image")
        .save(&input)
        .expect("save png");
    let output = dir.path().join("gray8.mha");

    let summary = convert::run(&options(&input, &output, None)).expect("convert");
    assert_eq!(summary.pixel_type, PixelType::UnsignedShort);

    let restored = formats::read_volume::<u16>(&output).expect("read");
    assert_eq!(restored.x_fastest().collect::<Vec<_>>(), vec![1, 200]);
}

#[test]
fn tiff_roundtrip_with_and_without_compression() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("slice.mha");
    let samples: Vec<u16> = (0..64 * 64).map(|v| (v / 256) as u16 * 1000).collect();
    let volume = Volume::from_x_fastest([64, 64, 1], samples.clone(), Geometry::default())
        .expect("volume");
    formats::write_volume(&input, &volume, false).expect("fixture");

    let plain = dir.path().join("plain.tif");
    let packed = dir.path().join("packed.tiff");
    convert::run(&options(&input, &plain, None)).expect("plain tiff");
    let mut opts = options(&input, &packed, None);
    opts.compress = true;
    convert::run(&opts).expect("compressed tiff");

    let plain_bytes = fs::read(&plain).unwrap();
    let packed_bytes = fs::read(&packed).unwrap();
    assert!(packed_bytes.len() < plain_bytes.len());

    for path in [&plain, &packed] {
        assert_eq!(formats::probe(path).expect("probe"), ComponentType::U16);
        let restored = formats::read_volume::<u16>(path).expect("read tiff");
        assert_eq!(restored.dims(), [64, 64, 1]);
        assert_eq!(restored.x_fastest().collect::<Vec<_>>(), samples);
    }
}

#[test]
fn scaled_nifti_defaults_to_float() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("scaled.nii");
    let volume =
        Volume::from_x_fastest([3, 1, 1], vec![1_i16, 3, 5], Geometry::default()).expect("volume");
    formats::write_volume(&input, &volume, false).expect("fixture");

    // scl_slope sits at byte 112 of the NIfTI-1 header.
    let mut bytes = fs::read(&input).unwrap();
    bytes[112..116].copy_from_slice(&0.5_f32.to_ne_bytes());
    fs::write(&input, bytes).unwrap();

    assert_eq!(formats::probe(&input).expect("probe"), ComponentType::F32);
    let output = dir.path().join("scaled.mha");
    let summary = convert::run(&options(&input, &output, None)).expect("convert");
    assert_eq!(summary.pixel_type, PixelType::Float);

    let restored = formats::read_volume::<f32>(&output).expect("read");
    assert_eq!(restored.x_fastest().collect::<Vec<_>>(), vec![0.5, 1.5, 2.5]);
}

#[test]
fn multi_frame_dicom_stacks_frames_along_z() {
    let dir = tempdir().expect("tempdir");
    let input = build_test_dicom(dir.path(), &[[0, 64, 128, 255], [10, 20, 30, 40]]);
    let output = dir.path().join("frames.mha");

    let summary = convert::run(&options(&input, &output, None)).expect("convert");
    assert_eq!(summary.dimensions, [2, 2, 2]);

    let volume = formats::read_volume::<i16>(&output).expect("read");
    assert_eq!(volume.data[[0, 0, 0]], -1024);
    assert_eq!(volume.data[[1, 0, 0]], -896);
    assert_eq!(volume.data[[0, 0, 1]], -1004);
    assert_eq!(volume.data[[1, 1, 1]], -944);
}

#[test]
fn compress_flag_on_plain_nii_writes_uncompressed() {
    let (dir, input, samples) = build_short_volume("input.mha");
    let output = dir.path().join("plain.nii");
    let mut opts = options(&input, &output, Some(DataType::Short));
    opts.compress = true;

    convert::run(&opts).expect("convert");
    let bytes = fs::read(&output).unwrap();
    assert!(!bytes.starts_with(&[0x1f, 0x8b]));

    let restored = formats::read_volume::<i16>(&output).expect("read");
    assert_eq!(restored.x_fastest().collect::<Vec<_>>(), samples);
}

#[test]
fn summary_counts_detached_data_file() {
    let (dir, input, _) = build_short_volume("input.mha");
    let output = dir.path().join("split.mhd");

    let summary =
        convert::run(&options(&input, &output, Some(DataType::Int))).expect("convert");
    let header_len = fs::metadata(&output).unwrap().len();
    let data_len = fs::metadata(dir.path().join("split.raw")).unwrap().len();
    assert_eq!(data_len, 6 * 5 * 4 * 4);
    assert_eq!(summary.bytes_written, header_len + data_len);
}
