use std::collections::BTreeMap;

/// Codec and container description assembled from worker queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaInfo {
    pub player_name: &'static str,
    pub video_decoder: Option<String>,
    pub video_decoder_impl: Option<String>,
    pub audio_decoder: Option<String>,
    pub audio_decoder_impl: Option<String>,
    pub meta: Option<BTreeMap<String, String>>,
}

/// Splits a `"decoder,impl"` codec string. The impl part may be absent.
pub(crate) fn split_codec_info(info: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(info) = info.filter(|info| !info.is_empty()) else {
        return (None, None);
    };
    let mut nodes = info.split(',');
    let decoder = nodes.next().map(str::to_string);
    let decoder_impl = Some(nodes.next().unwrap_or_default().to_string());
    (decoder, decoder_impl)
}
