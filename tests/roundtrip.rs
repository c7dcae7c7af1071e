use std::ops::Range;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use omfile::consts::{IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT};
use omfile::{Compression, MemoryBackend, OmArrayElement, OmFileReader, OmFileWriter};

async fn write_array_file<T: OmArrayElement>(
    values: &[T],
    dims: &[u64],
    chunks: &[u64],
    compression: Compression,
    scale_factor: f32,
    add_offset: f32,
) -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    let mut writer = OmFileWriter::new(backend.clone(), 1024);
    let mut array = writer
        .prepare_array::<T>(dims, chunks, compression, scale_factor, add_offset)
        .await
        .unwrap();
    let zero = vec![0u64; dims.len()];
    array.write_data(values, dims, &zero, dims).await.unwrap();
    let finalized = array.finalize().await.unwrap();
    let root = writer.write_array(finalized, "data", &[]).await.unwrap();
    writer.write_trailer(root).await.unwrap();
    backend
}

async fn read_full<T: OmArrayElement>(backend: Arc<MemoryBackend>, dims: &[u64]) -> Vec<T> {
    let reader = OmFileReader::open(backend).await.unwrap();
    let array = reader
        .as_array::<T>(IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT)
        .unwrap();
    let ranges: Vec<Range<u64>> = dims.iter().map(|&d| 0..d).collect();
    array.read(&ranges).await.unwrap()
}

#[tokio::test]
async fn scenario_5x5_int16_full_and_subcube() {
    let dims = [5u64, 5];
    let values: Vec<f32> = (0..25).map(|i| i as f32).collect();
    let backend = write_array_file(
        &values,
        &dims,
        &[2, 2],
        Compression::PforDelta2dInt16,
        100.0,
        0.0,
    )
    .await;

    let reader = OmFileReader::open(backend).await.unwrap();
    let array = reader
        .as_array::<f32>(IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT)
        .unwrap();
    assert_eq!(array.dimensions(), &[5, 5]);
    assert_eq!(array.chunk_dimensions(), &[2, 2]);
    assert_eq!(array.compression(), Compression::PforDelta2dInt16);
    assert_eq!(array.scale_factor(), 100.0);

    let full = array.read(&[0..5, 0..5]).await.unwrap();
    for (expected, got) in values.iter().zip(full.iter()) {
        assert!((expected - got).abs() < 0.01, "{expected} vs {got}");
    }

    let sub = array.read(&[1..4, 1..4]).await.unwrap();
    let mut expected = Vec::new();
    for row in 1..4u64 {
        for col in 1..4u64 {
            expected.push((row * 5 + col) as f32);
        }
    }
    for (expected, got) in expected.iter().zip(sub.iter()) {
        assert!((expected - got).abs() < 0.01, "{expected} vs {got}");
    }
}

#[tokio::test]
async fn scenario_1d_nan_positions_survive() {
    let values = vec![1.0f32, f32::NAN, 2.0, 3.0, f32::NAN, 4.0, 5.0];
    let backend = write_array_file(
        &values,
        &[7],
        &[3],
        Compression::PforDelta2dInt16,
        10.0,
        0.0,
    )
    .await;

    let decoded: Vec<f32> = read_full(backend, &[7]).await;
    for (i, (expected, got)) in values.iter().zip(decoded.iter()).enumerate() {
        if expected.is_nan() {
            assert!(got.is_nan(), "position {i} should be NaN");
        } else {
            assert!((expected - got).abs() <= 0.1, "{expected} vs {got}");
        }
    }
}

#[tokio::test]
async fn scenario_3d_fpxor_is_bit_exact() {
    let mut rng = StdRng::seed_from_u64(7);
    let values: Vec<f32> = (0..1000).map(|_| rng.gen_range(-100.0..100.0)).collect();
    let backend = write_array_file(
        &values,
        &[10, 10, 10],
        &[4, 4, 4],
        Compression::FpxXor2d,
        1.0,
        0.0,
    )
    .await;

    let decoded: Vec<f32> = read_full(backend, &[10, 10, 10]).await;
    for (expected, got) in values.iter().zip(decoded.iter()) {
        assert_eq!(expected.to_bits(), got.to_bits());
    }
}

#[tokio::test]
async fn scenario_scalar_string_root() {
    let backend = Arc::new(MemoryBackend::new());
    let mut writer = OmFileWriter::new(backend.clone(), 256);
    let root = writer
        .write_scalar(&"hello".to_string(), "greeting", &[])
        .await
        .unwrap();
    writer.write_trailer(root).await.unwrap();

    let reader = OmFileReader::open(backend).await.unwrap();
    assert_eq!(reader.name(), "greeting");
    assert_eq!(reader.children_count(), 0);
    assert_eq!(reader.read_scalar::<String>(), Some("hello".to_string()));
    // Mismatched type request returns None instead of garbage.
    assert_eq!(reader.read_scalar::<i64>(), None);
}

#[tokio::test]
async fn scenario_array_with_scalar_children() {
    let backend = Arc::new(MemoryBackend::new());
    let mut writer = OmFileWriter::new(backend.clone(), 1024);

    let units = writer
        .write_scalar(&"m".to_string(), "units", &[])
        .await
        .unwrap();
    let long_name = writer
        .write_scalar(&"height".to_string(), "long_name", &[])
        .await
        .unwrap();

    let values: Vec<f32> = (0..12).map(|i| i as f32 * 0.5).collect();
    let mut array = writer
        .prepare_array::<f32>(&[3, 4], &[2, 2], Compression::PforDelta2d, 1000.0, 0.0)
        .await
        .unwrap();
    array
        .write_data(&values, &[3, 4], &[0, 0], &[3, 4])
        .await
        .unwrap();
    let finalized = array.finalize().await.unwrap();
    let root = writer
        .write_array(finalized, "height", &[units, long_name])
        .await
        .unwrap();
    writer.write_trailer(root).await.unwrap();

    let reader = OmFileReader::open(backend).await.unwrap();
    assert_eq!(reader.children_count(), 2);

    let units = reader.child_by_name("units").await.unwrap().unwrap();
    assert_eq!(units.read_scalar::<String>(), Some("m".to_string()));
    let long_name = reader.child_by_name("long_name").await.unwrap().unwrap();
    assert_eq!(long_name.read_scalar::<String>(), Some("height".to_string()));
    assert!(reader.child_by_name("missing").await.unwrap().is_none());

    let array = reader
        .as_array::<f32>(IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT)
        .unwrap();
    let decoded = array.read(&[0..3, 0..4]).await.unwrap();
    for (expected, got) in values.iter().zip(decoded.iter()) {
        assert!((expected - got).abs() < 0.001);
    }
}

#[tokio::test]
async fn scenario_legacy_header_matches_v3_content() {
    let dims = [5u64, 5];
    let chunks = [2u64, 2];
    let values: Vec<f32> = (0..25).map(|i| (i as f32) * 0.25 - 2.0).collect();

    // Hand-assemble a legacy file: 40-byte header, raw LUT, chunk stream.
    let encoder = omfile::encoder::OmEncoder::new(
        omfile::DataType::FloatArray,
        Compression::PforDelta2dInt16,
        100.0,
        0.0,
        &dims,
        &chunks,
    )
    .unwrap();
    let value_bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let mut scratch = vec![0u8; encoder.chunk_buffer_size()];
    let mut out = vec![0u8; encoder.compressed_chunk_buffer_size()];
    let mut blobs = Vec::new();
    for chunk in 0..encoder.number_of_chunks() {
        let written = encoder
            .compress_chunk(
                &value_bytes,
                &dims,
                &[0, 0],
                &dims,
                chunk,
                chunk,
                &mut out,
                &mut scratch,
            )
            .unwrap();
        blobs.push(out[..written].to_vec());
    }

    let mut file = Vec::new();
    file.extend_from_slice(b"OM");
    file.push(2);
    file.push(Compression::PforDelta2dInt16 as u8);
    for &d in &dims {
        file.extend_from_slice(&d.to_le_bytes());
    }
    for &c in &chunks {
        file.extend_from_slice(&c.to_le_bytes());
    }
    file.extend_from_slice(&100.0f32.to_le_bytes());
    assert_eq!(file.len(), 40);

    let data_start = 40 + (blobs.len() as u64 + 1) * 8;
    let mut offset = data_start;
    file.extend_from_slice(&offset.to_le_bytes());
    for blob in &blobs {
        offset += blob.len() as u64;
        file.extend_from_slice(&offset.to_le_bytes());
    }
    for blob in &blobs {
        file.extend_from_slice(blob);
    }

    let legacy = OmFileReader::open(MemoryBackend::from_vec(file)).await.unwrap();
    assert_eq!(legacy.data_type(), omfile::DataType::FloatArray);
    let legacy_array = legacy
        .as_array::<f32>(IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT)
        .unwrap();
    let legacy_sub = legacy_array.read(&[1..4, 0..3]).await.unwrap();

    // The same content through the v3 writer must decode identically.
    let v3 = write_array_file(
        &values,
        &dims,
        &chunks,
        Compression::PforDelta2dInt16,
        100.0,
        0.0,
    )
    .await;
    let v3 = OmFileReader::open(v3).await.unwrap();
    let v3_array = v3
        .as_array::<f32>(IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT)
        .unwrap();
    let v3_sub = v3_array.read(&[1..4, 0..3]).await.unwrap();

    assert_eq!(legacy_sub.len(), v3_sub.len());
    for (a, b) in legacy_sub.iter().zip(v3_sub.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[tokio::test]
async fn garbage_file_is_not_an_om_file() {
    let backend = MemoryBackend::from_vec(vec![0xABu8; 256]);
    match OmFileReader::open(backend).await {
        Err(omfile::OmError::NotAnOmFile) => {}
        other => panic!("expected NotAnOmFile, got {other:?}", other = other.err()),
    }
}

#[tokio::test]
async fn cube_into_cube_leaves_outside_untouched() {
    let dims = [4u64, 4];
    let values: Vec<f32> = (0..16).map(|i| i as f32).collect();
    let backend = write_array_file(
        &values,
        &dims,
        &[2, 2],
        Compression::PforDelta2d,
        1000.0,
        0.0,
    )
    .await;

    let reader = OmFileReader::open(backend).await.unwrap();
    let array = reader
        .as_array::<f32>(IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT)
        .unwrap();

    // Place a 2x2 sub-cube at (1, 1) inside a 4x4 output cube.
    let marker = -9999.0f32;
    let mut out = vec![marker; 16];
    array
        .read_into(&mut out, &[1, 1], &[2, 2], &[1, 1], &[4, 4])
        .await
        .unwrap();

    for row in 0..4usize {
        for col in 0..4usize {
            let got = out[row * 4 + col];
            if (1..3).contains(&row) && (1..3).contains(&col) {
                let expected = (row * 4 + col) as f32;
                assert!((got - expected).abs() < 0.001, "{row},{col}: {got}");
            } else {
                assert_eq!(got, marker, "{row},{col} was overwritten");
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_read_equals_sequential() {
    let mut rng = StdRng::seed_from_u64(21);
    let dims = [19u64, 23];
    let values: Vec<f32> = (0..19 * 23).map(|_| rng.gen_range(-50.0..50.0)).collect();
    let backend = write_array_file(
        &values,
        &dims,
        &[4, 5],
        Compression::FpxXor2d,
        1.0,
        0.0,
    )
    .await;

    let reader = OmFileReader::open(backend).await.unwrap();
    let array = reader
        .as_array::<f32>(IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT)
        .unwrap();

    let ranges = [2..17, 3..20];
    let sequential = array.read(&ranges).await.unwrap();
    let concurrent = array.read_concurrent(&ranges).await.unwrap();
    assert_eq!(sequential.len(), concurrent.len());
    for (a, b) in sequential.iter().zip(concurrent.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[tokio::test]
async fn will_need_plans_without_reading_data() {
    let values: Vec<f32> = (0..100).map(|i| i as f32).collect();
    let backend = write_array_file(
        &values,
        &[10, 10],
        &[3, 3],
        Compression::PforDelta2d,
        10.0,
        0.0,
    )
    .await;

    let reader = OmFileReader::open(backend).await.unwrap();
    let array = reader
        .as_array::<f32>(IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT)
        .unwrap();
    // Advisory only; must succeed and leave subsequent reads working.
    array.will_need(&[0..10, 0..10]).await.unwrap();
    let full = array.read(&[0..10, 0..10]).await.unwrap();
    assert!((full[55] - 55.0).abs() < 0.001);
}

#[tokio::test]
async fn out_of_bounds_request_fails_before_io() {
    let values: Vec<f32> = (0..25).map(|i| i as f32).collect();
    let backend = write_array_file(
        &values,
        &[5, 5],
        &[2, 2],
        Compression::PforDelta2d,
        10.0,
        0.0,
    )
    .await;

    let reader = OmFileReader::open(backend).await.unwrap();
    let array = reader
        .as_array::<f32>(IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT)
        .unwrap();
    let err = array.read(&[0..6, 0..5]).await.unwrap_err();
    assert!(matches!(err, omfile::OmError::InvalidArgument(_)));
    // Type mismatch surfaces as None at the facade.
    assert!(reader
        .as_array::<f64>(IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT)
        .is_none());
}

#[tokio::test]
async fn multi_call_write_data_appends_chunks_in_order() {
    let dims = [4u64, 6];
    let chunks = [2u64, 3];
    let values: Vec<i32> = (0..24).map(|i| i * 3 - 7).collect();

    let backend = Arc::new(MemoryBackend::new());
    let mut writer = OmFileWriter::new(backend.clone(), 256);
    let mut array = writer
        .prepare_array::<i32>(&dims, &chunks, Compression::PforDelta2d, 1.0, 0.0)
        .await
        .unwrap();
    // Two slabs of two rows each, written in canonical chunk order.
    array
        .write_data(&values[..12], &[2, 6], &[0, 0], &[2, 6])
        .await
        .unwrap();
    array
        .write_data(&values[12..], &[2, 6], &[0, 0], &[2, 6])
        .await
        .unwrap();
    let finalized = array.finalize().await.unwrap();
    let root = writer.write_array(finalized, "grid", &[]).await.unwrap();
    writer.write_trailer(root).await.unwrap();

    let decoded: Vec<i32> = read_full(backend, &dims).await;
    assert_eq!(decoded, values);
}

#[tokio::test]
async fn finalize_rejects_partial_writes() {
    let backend = Arc::new(MemoryBackend::new());
    let mut writer = OmFileWriter::new(backend, 256);
    let mut array = writer
        .prepare_array::<f32>(&[4, 4], &[2, 2], Compression::PforDelta2d, 1.0, 0.0)
        .await
        .unwrap();
    let values: Vec<f32> = (0..8).map(|i| i as f32).collect();
    array
        .write_data(&values, &[2, 4], &[0, 0], &[2, 4])
        .await
        .unwrap();
    let err = array.finalize().await.unwrap_err();
    assert!(matches!(err, omfile::OmError::InvalidArgument(_)));
}

fn subcube_of(full: &[f32], dims: &[u64], offset: &[u64], count: &[u64]) -> Vec<f32> {
    let mut out = Vec::new();
    let mut index = vec![0u64; dims.len()];
    'outer: loop {
        let mut linear = 0u64;
        for i in 0..dims.len() {
            linear = linear * dims[i] + offset[i] + index[i];
        }
        out.push(full[linear as usize]);

        let mut axis = dims.len();
        while axis > 0 {
            axis -= 1;
            index[axis] += 1;
            if index[axis] < count[axis] {
                continue 'outer;
            }
            index[axis] = 0;
        }
        break;
    }
    out
}

#[tokio::test]
async fn random_subcubes_equal_full_read_slices() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..20 {
        let rank = rng.gen_range(1..=3);
        let dims: Vec<u64> = (0..rank).map(|_| rng.gen_range(1..=12)).collect();
        let chunks: Vec<u64> = dims.iter().map(|&d| rng.gen_range(1..=d)).collect();
        let elements: u64 = dims.iter().product();
        let values: Vec<f32> = (0..elements)
            .map(|_| rng.gen_range(-100.0f32..100.0))
            .collect();

        let backend = write_array_file(
            &values,
            &dims,
            &chunks,
            Compression::FpxXor2d,
            1.0,
            0.0,
        )
        .await;
        let reader = OmFileReader::open(backend).await.unwrap();
        let array = reader
            .as_array::<f32>(IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT)
            .unwrap();

        let full = array
            .read(&dims.iter().map(|&d| 0..d).collect::<Vec<_>>())
            .await
            .unwrap();
        assert_eq!(full.len(), values.len());
        for (a, b) in values.iter().zip(full.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }

        let offset: Vec<u64> = dims.iter().map(|&d| rng.gen_range(0..d)).collect();
        let count: Vec<u64> = dims
            .iter()
            .zip(offset.iter())
            .map(|(&d, &o)| rng.gen_range(1..=d - o))
            .collect();
        let ranges: Vec<Range<u64>> = offset
            .iter()
            .zip(count.iter())
            .map(|(&o, &n)| o..o + n)
            .collect();
        let sub = array.read(&ranges).await.unwrap();
        let expected = subcube_of(&full, &dims, &offset, &count);
        assert_eq!(sub.len(), expected.len());
        for (a, b) in expected.iter().zip(sub.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}

#[tokio::test]
async fn random_quantized_roundtrips_stay_within_half_step() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..10 {
        let dims: Vec<u64> = vec![rng.gen_range(1..=9), rng.gen_range(1..=9)];
        let chunks: Vec<u64> = dims.iter().map(|&d| rng.gen_range(1..=d)).collect();
        let elements: u64 = dims.iter().product();
        let values: Vec<f32> = (0..elements)
            .map(|_| rng.gen_range(-300.0f32..300.0))
            .collect();

        let backend = write_array_file(
            &values,
            &dims,
            &chunks,
            Compression::PforDelta2dInt16,
            20.0,
            0.0,
        )
        .await;
        let decoded: Vec<f32> = read_full(backend, &dims).await;
        for (expected, got) in values.iter().zip(decoded.iter()) {
            assert!(
                (expected - got).abs() <= 0.5 / 20.0 + 1e-3,
                "{expected} vs {got}"
            );
        }
    }
}

#[tokio::test]
async fn integer_arrays_roundtrip_exactly() {
    let mut rng = StdRng::seed_from_u64(13);
    let dims = [6u64, 7, 3];
    let elements: u64 = dims.iter().product();

    let signed: Vec<i16> = (0..elements).map(|_| rng.gen_range(-500..500)).collect();
    let backend = write_array_file(
        &signed,
        &dims,
        &[2, 4, 2],
        Compression::PforDelta2d,
        1.0,
        0.0,
    )
    .await;
    assert_eq!(read_full::<i16>(backend, &dims).await, signed);

    let unsigned: Vec<u64> = (0..elements).map(|_| rng.gen()).collect();
    let backend = write_array_file(
        &unsigned,
        &dims,
        &[3, 3, 3],
        Compression::PforDelta2d,
        1.0,
        0.0,
    )
    .await;
    assert_eq!(read_full::<u64>(backend, &dims).await, unsigned);
}

#[tokio::test]
async fn double_array_roundtrips_through_fpxor() {
    let mut rng = StdRng::seed_from_u64(3);
    let values: Vec<f64> = (0..64).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let backend = write_array_file(
        &values,
        &[8, 8],
        &[3, 3],
        Compression::FpxXor2d,
        1.0,
        0.0,
    )
    .await;
    let decoded: Vec<f64> = read_full(backend, &[8, 8]).await;
    for (a, b) in values.iter().zip(decoded.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[tokio::test]
async fn scalars_of_every_numeric_type_roundtrip() {
    let backend = Arc::new(MemoryBackend::new());
    let mut writer = OmFileWriter::new(backend.clone(), 1024);

    let a = writer.write_scalar(&-5i8, "a", &[]).await.unwrap();
    let b = writer.write_scalar(&40_000u16, "b", &[]).await.unwrap();
    let c = writer.write_scalar(&-7_000_000i64, "c", &[]).await.unwrap();
    let d = writer.write_scalar(&1.5f64, "d", &[]).await.unwrap();
    let root = writer
        .write_scalar(&0u8, "root", &[a, b, c, d])
        .await
        .unwrap();
    writer.write_trailer(root).await.unwrap();

    let reader = OmFileReader::open(backend).await.unwrap();
    assert_eq!(reader.children_count(), 4);
    let a = reader.child(0).await.unwrap().unwrap();
    assert_eq!(a.read_scalar::<i8>(), Some(-5));
    let b = reader.child(1).await.unwrap().unwrap();
    assert_eq!(b.read_scalar::<u16>(), Some(40_000));
    let c = reader.child(2).await.unwrap().unwrap();
    assert_eq!(c.read_scalar::<i64>(), Some(-7_000_000));
    let d = reader.child(3).await.unwrap().unwrap();
    assert_eq!(d.read_scalar::<f64>(), Some(1.5));
    assert!(reader.child(4).await.unwrap().is_none());
}

#[tokio::test]
async fn file_written_through_std_file_reads_back_through_mmap() {
    let path = std::env::temp_dir().join(format!(
        "omfile-roundtrip-{}.om",
        std::process::id()
    ));
    let file = std::fs::File::create(&path).unwrap();

    let values: Vec<f32> = (0..60).map(|i| (i as f32).sin()).collect();
    let mut writer = OmFileWriter::new(omfile::StdFileBackend::new(file), 256);
    let mut array = writer
        .prepare_array::<f32>(&[6, 10], &[2, 4], Compression::FpxXor2d, 1.0, 0.0)
        .await
        .unwrap();
    array
        .write_data(&values, &[6, 10], &[0, 0], &[6, 10])
        .await
        .unwrap();
    let finalized = array.finalize().await.unwrap();
    let root = writer.write_array(finalized, "wave", &[]).await.unwrap();
    writer.write_trailer(root).await.unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let backend = omfile::MmapBackend::new(&file).unwrap();
    let reader = OmFileReader::open(backend).await.unwrap();
    let array = reader
        .as_array::<f32>(IO_SIZE_MAX_DEFAULT, IO_SIZE_MERGE_DEFAULT)
        .unwrap();
    array.will_need(&[0..6, 0..10]).await.unwrap();
    let decoded = array.read(&[0..6, 0..10]).await.unwrap();
    for (a, b) in values.iter().zip(decoded.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn small_io_thresholds_still_decode_correctly() {
    // Force the planner to split aggressively: max read of 64 bytes, no
    // merging across gaps.
    let values: Vec<f32> = (0..400).map(|i| (i % 37) as f32).collect();
    let backend = write_array_file(
        &values,
        &[20, 20],
        &[3, 3],
        Compression::FpxXor2d,
        1.0,
        0.0,
    )
    .await;

    let reader = OmFileReader::open(backend).await.unwrap();
    let array = reader.as_array::<f32>(64, 0).unwrap();
    let full = array.read(&[0..20, 0..20]).await.unwrap();
    for (a, b) in values.iter().zip(full.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
