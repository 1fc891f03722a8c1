use flowvol::VolumeGrid;
use ndarray::Array4;

/// A grid whose voxels all hold distinct, exactly representable values.
pub fn ramp_grid(dims: [usize; 3], channels: usize) -> VolumeGrid {
    let len = dims.iter().product::<usize>() * channels;
    let values = (0..len).map(|i| i as f32 * 0.25 - 7.5).collect();
    let voxels = Array4::from_shape_vec((dims[0], dims[1], dims[2], channels), values).unwrap();
    VolumeGrid::new(voxels, [0.5, 1.0, 2.0], [1.0, 2.0, -4.0]).unwrap()
}

/// A vector grid holding the same vector in every voxel.
#[allow(dead_code)]
pub fn uniform_grid(dims: [usize; 3], vector: [f32; 3]) -> VolumeGrid {
    let mut voxels = Array4::zeros((dims[0], dims[1], dims[2], 3));
    for mut v in voxels.lanes_mut(ndarray::Axis(3)) {
        v[0] = vector[0];
        v[1] = vector[1];
        v[2] = vector[2];
    }
    VolumeGrid::new(voxels, [1.0; 3], [0.0; 3]).unwrap()
}

/// Header text of an uncompressed MHA file, with `replace` overriding or
/// (when the value is `None`) removing lines by key.
#[allow(dead_code)]
pub fn header_text(dims: [usize; 3], channels: usize, replace: &[(&str, Option<&str>)]) -> String {
    let dim_size = format!("{} {} {}", dims[0], dims[1], dims[2]);
    let channels = channels.to_string();
    let lines = [
        ("ObjectType", "Image"),
        ("NDims", "3"),
        ("BinaryData", "True"),
        ("BinaryDataByteOrderMSB", "False"),
        ("CompressedData", "False"),
        ("TransformMatrix", "-1 0 0 0 -1 0 0 0 1"),
        ("Offset", "0 0 0"),
        ("CenterOfRotation", "0 0 0"),
        ("AnatomicalOrientation", "LPI"),
        ("ElementSpacing", "1 1 1"),
        ("DimSize", &dim_size),
        ("ElementNumberOfChannels", &channels),
        ("ElementType", "MET_FLOAT"),
        ("ElementDataFile", "LOCAL"),
    ];
    let mut text = String::new();
    for (key, value) in lines.iter() {
        let value = match replace.iter().find(|(k, _)| k == key) {
            Some((_, Some(v))) => v,
            Some((_, None)) => continue,
            None => value,
        };
        text.push_str(&format!("{} = {}\n", key, value));
    }
    text
}

/// Big endian bytes of consecutive floats.
#[allow(dead_code)]
pub fn be_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes().to_vec()).collect()
}

/// Bit patterns of all voxels, for exact comparisons.
#[allow(dead_code)]
pub fn bits(grid: &VolumeGrid) -> Vec<u32> {
    grid.voxels().iter().map(|v| v.to_bits()).collect()
}
