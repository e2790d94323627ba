#[cfg(feature = "compression")]
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};
use crate::parser::{FilterRegistry, ParseResult};

/// Stream dictionary plus its payload, kept exactly as stored in the file.
/// Decoding happens only when a caller asks for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    dictionary: Dictionary,
    data: Vec<u8>,
}

impl Stream {
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_dictionary(Dictionary::new(), data)
    }

    /// Builds a stream whose `/Length` matches `data`.
    pub fn with_dictionary(dictionary: Dictionary, data: Vec<u8>) -> Self {
        let mut dictionary = dictionary;
        dictionary.set("Length", data.len() as i64);
        Self { dictionary, data }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    /// Raw (possibly encoded) payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.dictionary.set("Length", data.len() as i64);
        self.data = data;
    }

    /// Filter chain in application order. Accepts both a single name and
    /// an array of names.
    pub fn filters(&self) -> Vec<String> {
        match self.dictionary.get("Filter") {
            Some(Object::Name(name)) => vec![name.clone()],
            Some(Object::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_name().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Decode parameters matching each filter; missing entries are `None`.
    pub fn decode_params(&self) -> Vec<Option<Dictionary>> {
        let count = self.filters().len();
        match self.dictionary.get("DecodeParms") {
            Some(Object::Dictionary(params)) => {
                let mut out = vec![None; count.max(1)];
                out[0] = Some(params.clone());
                out
            }
            Some(Object::Array(items)) => (0..count)
                .map(|i| items.get(i).and_then(|o| o.as_dict()).cloned())
                .collect(),
            _ => vec![None; count],
        }
    }

    pub fn is_encoded(&self) -> bool {
        !self.filters().is_empty()
    }

    /// Apply the declared filter chain with the codecs in `registry`.
    pub fn decode(&self, registry: &FilterRegistry) -> ParseResult<Vec<u8>> {
        registry.decode_stream(self)
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.dictionary.set("Filter", Object::name(filter));
    }

    #[cfg(feature = "compression")]
    pub fn compress_flate(&mut self) -> Result<()> {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&self.data)
            .map_err(|e| PdfError::CompressionError(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| PdfError::CompressionError(e.to_string()))?;

        self.set_data(compressed);
        self.set_filter("FlateDecode");
        self.dictionary.remove("DecodeParms");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_new_sets_length() {
        let stream = Stream::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(stream.data(), &[1, 2, 3, 4, 5]);
        assert_eq!(stream.dictionary().get_integer("Length"), Some(5));
        assert!(!stream.is_encoded());
    }

    #[test]
    fn test_with_dictionary_overrides_length() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XObject"));
        dict.set("Length", 999);

        let stream = Stream::with_dictionary(dict, vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(stream.dictionary().get_integer("Length"), Some(3));
        assert_eq!(stream.dictionary().get_type(), Some("XObject"));
    }

    #[test]
    fn test_filter_chain_forms() {
        let mut single = Stream::new(vec![]);
        single.set_filter("FlateDecode");
        assert_eq!(single.filters(), vec!["FlateDecode"]);

        let mut dict = Dictionary::new();
        dict.set(
            "Filter",
            vec![Object::name("ASCIIHexDecode"), Object::name("FlateDecode")],
        );
        let mut params = Dictionary::new();
        params.set("Predictor", 12);
        dict.set("DecodeParms", vec![Object::Null, Object::Dictionary(params)]);
        let chained = Stream::with_dictionary(dict, vec![]);

        assert_eq!(chained.filters(), vec!["ASCIIHexDecode", "FlateDecode"]);
        let parms = chained.decode_params();
        assert!(parms[0].is_none());
        assert_eq!(
            parms[1].as_ref().and_then(|p| p.get_integer("Predictor")),
            Some(12)
        );
    }

    #[test]
    fn test_set_data_updates_length() {
        let mut stream = Stream::new(vec![1]);
        stream.set_data(vec![1, 2, 3]);
        assert_eq!(stream.dictionary().get_integer("Length"), Some(3));
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_compress_then_decode() {
        let original = b"BT /F1 12 Tf (Hello) Tj ET".repeat(20);
        let mut stream = Stream::new(original.clone());
        stream.compress_flate().unwrap();

        assert_eq!(stream.filters(), vec!["FlateDecode"]);
        assert!(stream.data().len() < original.len());
        let decoded = stream.decode(&FilterRegistry::default()).unwrap();
        assert_eq!(decoded, original);
    }
}
