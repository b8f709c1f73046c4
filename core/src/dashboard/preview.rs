/// Extracts the video id from `youtube.com/watch?v=<id>` and `youtu.be/<id>` links.
pub fn youtube_video_id(url: &str) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or(url);

    if without_fragment.contains("youtu.be") {
        let path = without_fragment
            .split('?')
            .next()
            .unwrap_or(without_fragment);
        let id = path.trim_end_matches('/').rsplit('/').next()?;
        return non_empty(id);
    }

    if without_fragment.contains("youtube.com") {
        let (_, query) = without_fragment.split_once('?')?;
        return query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "v")
            .and_then(|(_, value)| non_empty(value));
    }

    None
}

fn non_empty(id: &str) -> Option<String> {
    if id.is_empty() || id.contains("youtu.be") {
        None
    } else {
        Some(id.to_string())
    }
}
