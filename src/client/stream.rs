use futures::{ Stream, StreamExt };

/// Incremental UTF-8 decoder. Sequences split across chunks are held back until
/// complete; invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        let mut input = &self.pending[..];
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    input = &[];
                    break;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            // incomplete sequence at the end, wait for more bytes
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }

        let rest = input.to_vec();
        self.pending = rest;
        out
    }

    /// Flushes whatever is still buffered once the input has ended.
    pub fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

/// Folds a byte stream into one growing string, handing the whole text so far
/// to `on_update` after every chunk that added to it. Returns the final text,
/// or the first read error.
pub async fn consume_stream<S, B, E, F>(stream: S, mut on_update: F) -> Result<String, E>
    where S: Stream<Item = Result<B, E>>, B: AsRef<[u8]>, F: FnMut(&str)
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = Utf8Decoder::new();
    let mut full_text = String::new();

    while let Some(chunk) = stream.next().await {
        let piece = decoder.decode(chunk?.as_ref());
        if !piece.is_empty() {
            full_text.push_str(&piece);
            on_update(&full_text);
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() {
        full_text.push_str(&tail);
        on_update(&full_text);
    }

    Ok(full_text)
}
