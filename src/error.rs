use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpeglsError {
    #[error("Invalid compressed data")]
    InvalidCompressedData = 1,
    #[error("Too much compressed data")]
    TooMuchCompressedData = 2,
    #[error("Compressed buffer too small")]
    CompressedBufferTooSmall = 3,
    #[error("Uncompressed buffer too small")]
    UncompressedBufferTooSmall = 4,
    #[error("Need more data")]
    NeedMoreData = 5,
    #[error("Parameter value not supported")]
    ParameterValueNotSupported = 6,
    #[error("Color transform not supported")]
    ColorTransformNotSupported = 7,
    #[error("JPEG marker start byte not found")]
    JpegMarkerStartByteNotFound = 8,
    #[error("Start of image marker not found")]
    StartOfImageMarkerNotFound = 9,
    #[error("Unknown JPEG marker found")]
    UnknownJpegMarkerFound = 10,
    #[error("Unexpected start of scan marker")]
    UnexpectedStartOfScanMarker = 11,
    #[error("Invalid marker segment size")]
    InvalidMarkerSegmentSize = 12,
    #[error("Duplicate start of image marker")]
    DuplicateStartOfImageMarker = 13,
    #[error("Duplicate start of frame marker")]
    DuplicateStartOfFrameMarker = 14,
    #[error("Unexpected end of image marker")]
    UnexpectedEndOfImageMarker = 15,
    #[error("Invalid JPEG-LS preset parameter type")]
    InvalidJpeglsPresetParameterType = 16,
    #[error("End of image marker not found")]
    EndOfImageMarkerNotFound = 17,
    #[error("Invalid parameter width")]
    InvalidParameterWidth = 18,
    #[error("Invalid parameter height")]
    InvalidParameterHeight = 19,
    #[error("Invalid parameter bits per sample")]
    InvalidParameterBitsPerSample = 20,
    #[error("Invalid parameter component count")]
    InvalidParameterComponentCount = 21,
    #[error("Invalid parameter interleave mode")]
    InvalidParameterInterleaveMode = 22,
    #[error("Invalid parameter near lossless")]
    InvalidParameterNearLossless = 23,
    #[error("Invalid parameter JPEG-LS preset coding parameters")]
    InvalidParameterPresetCodingParameters = 24,

    // Logic errors
    #[error("Invalid operation")]
    InvalidOperation = 100,
    #[error("Invalid argument")]
    InvalidArgument = 101,
    #[error("Invalid argument width")]
    InvalidArgumentWidth = 102,
    #[error("Invalid argument height")]
    InvalidArgumentHeight = 103,
    #[error("Invalid argument bits per sample")]
    InvalidArgumentBitsPerSample = 104,
    #[error("Invalid argument component count")]
    InvalidArgumentComponentCount = 105,
    #[error("Invalid argument interleave mode")]
    InvalidArgumentInterleaveMode = 106,
    #[error("Invalid argument near lossless")]
    InvalidArgumentNearLossless = 107,
    #[error("Invalid argument preset coding parameters")]
    InvalidArgumentPresetCodingParameters = 108,
    #[error("Invalid argument size")]
    InvalidArgumentSize = 109,
    #[error("Invalid argument stride")]
    InvalidArgumentStride = 110,
}
