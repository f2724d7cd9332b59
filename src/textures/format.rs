//! Encodings, filters and versions understood by VTFCmd

use super::token_enum;

token_enum! {
    /// Pixel layout of the encoded texture
    pub enum TextureFormat {
        /// Lossy compression without alpha
        Dxt1 => "DXT1",
        /// Lossy compression with 1-bit alpha
        Dxt3 => "DXT3",
        /// Lossy compression with good alpha
        Dxt5 => "DXT5",
        Bgr888 => "BGR888",
        Bgr565 => "BGR565",
        Bgra8888 => "BGRA8888",
        Bgra4444 => "BGRA4444",
        /// Luminance only
        I8 => "I8",
        Ia88 => "IA88",
        /// Alpha only
        A8 => "A8",
        Dxt1OneBitAlpha => "DXT1_ONEBITALPHA",
        Rgb888 => "RGB888",
        Rgb565 => "RGB565",
        Rgba8888 => "RGBA8888",
        Abgr8888 => "ABGR8888",
        Rgb888Bluescreen => "RGB888_BLUESCREEN",
        Bgr888Bluescreen => "BGR888_BLUESCREEN",
        Argb8888 => "ARGB8888",
        Bgrx8888 => "BGRX8888",
        Bgrx5551 => "BGRX5551",
        Bgra5551 => "BGRA5551",
        /// Two channel normal maps
        Uv88 => "UV88",
        Uvwq8888 => "UVWQ8888",
        /// Float HDR
        Rgba16161616F => "RGBA16161616F",
        /// Integer HDR
        Rgba16161616 => "RGBA16161616",
        Uvlx8888 => "UVLX8888",
    }
}

token_enum! {
    /// Downsampling filter used for resizing and mipmap generation
    pub enum ResampleFilter {
        Point => "POINT",
        Box => "BOX",
        Triangle => "TRIANGLE",
        Quadratic => "QUADRATIC",
        Cubic => "CUBIC",
        Catrom => "CATROM",
        Mitchell => "MITCHELL",
        Gaussian => "GAUSSIAN",
        Sinc => "SINC",
        Bessel => "BESSEL",
        Hanning => "HANNING",
        Hamming => "HAMMING",
        Blackman => "BLACKMAN",
        Kaiser => "KAISER",
    }
}

token_enum! {
    /// Post-resample filter (legacy encoder only)
    pub enum SharpenFilter {
        None => "NONE",
        Negative => "NEGATIVE",
        Lighter => "LIGHTER",
        Darker => "DARKER",
        ContrastMore => "CONTRASTMORE",
        ContrastLess => "CONTRASTLESS",
        Smoothen => "SMOOTHEN",
        SharpenSoft => "SHARPENSOFT",
        SharpenMedium => "SHARPENMEDIUM",
        SharpenStrong => "SHARPENSTRONG",
        FindEdges => "FINDEDGES",
        Contour => "CONTOUR",
        EdgeDetect => "EDGEDETECT",
        EdgeDetectSoft => "EDGEDETECTSOFT",
        Emboss => "EMBOSS",
        MeanRemoval => "MEANREMOVAL",
        Unsharp => "UNSHARP",
        XSharpen => "XSHARPEN",
        WarpSharp => "WARPSHARP",
    }
}

token_enum! {
    /// Power-of-two alignment policy for resizing
    pub enum ResizeMethod {
        /// 1023 -> 1024, 570 -> 512
        Nearest => "NEAREST",
        /// 1023 -> 1024, 570 -> 1024
        Biggest => "BIGGEST",
        /// 1023 -> 512, 570 -> 512
        Smallest => "SMALLEST",
    }
}

token_enum! {
    /// VTF container version written into the header
    pub enum ContainerVersion {
        /// Alien Swarm and later
        V7_5 => "7.5",
        /// Orange Box, Source SDK 2013
        V7_4 => "7.4",
        V7_3 => "7.3",
        V7_2 => "7.2",
        /// Original Half-Life 2 release
        V7_1 => "7.1",
    }
}

token_enum! {
    /// Which VTFCmd build to drive
    pub enum EncoderVariant {
        /// VTFCmd "reloaded"
        Current => "CURRENT",
        /// Original VTFCmd, accepts sharpen filters
        Legacy => "LEGACY",
    }
}

impl ResizeMethod {
    /// Align one dimension to a power of two following this policy
    pub fn align(&self, n: u32) -> u32 {
        if n <= 1 {
            return 1;
        }
        let up = n.next_power_of_two();
        let down = if up == n { n } else { up / 2 };
        match self {
            ResizeMethod::Biggest => up,
            ResizeMethod::Smallest => down,
            ResizeMethod::Nearest => {
                if up - n < n - down {
                    up
                } else {
                    down
                }
            }
        }
    }
}

impl EncoderVariant {
    /// Whether this encoder accepts `-rsharpen` / `-msharpen`
    pub fn accepts_sharpen(&self) -> bool {
        matches!(self, EncoderVariant::Legacy)
    }
}
