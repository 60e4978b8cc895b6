tonic::include_proto!("vision");

/// Encoded descriptor set for the `vision` package, used for server reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("vision_descriptor");
