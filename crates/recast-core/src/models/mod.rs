pub mod conversion;

pub use conversion::{
    Artifact, ConversionRequest, ConversionResult, ConversionSettings, SourceFile,
};
