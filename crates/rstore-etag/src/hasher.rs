use rstore_types::ETag;

/// Domain-separated BLAKE3 fingerprinter.
///
/// The domain tag is prepended to every computation so that identical bytes
/// hashed for different purposes yield different tags.
pub struct ETagHasher {
    domain: &'static str,
}

impl ETagHasher {
    /// Hasher for document content.
    pub const OBJECT: Self = Self {
        domain: "rstore-object-v1",
    };
    /// Hasher for folder listings.
    pub const FOLDER: Self = Self {
        domain: "rstore-folder-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    fn start(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }

    /// Fingerprint raw bytes.
    pub fn etag(&self, data: &[u8]) -> ETag {
        let mut hasher = self.start();
        hasher.update(data);
        ETag::from_digest(hasher.finalize().as_bytes())
    }

    /// Fingerprint a folder from its child entries.
    ///
    /// Entries are sorted by name before hashing, so the result does not
    /// depend on the order they are supplied in. Names and tags are length
    /// prefixed, which keeps `("ab", "c")` and `("a", "bc")` apart.
    pub fn folder_etag<'a, I>(&self, entries: I) -> ETag
    where
        I: IntoIterator<Item = (&'a str, &'a ETag)>,
    {
        let mut sorted: Vec<(&str, &ETag)> = entries.into_iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let mut hasher = self.start();
        hasher.update(&(sorted.len() as u64).to_le_bytes());
        for (name, tag) in sorted {
            let tag = tag.opaque();
            hasher.update(&(name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update(&(tag.len() as u64).to_le_bytes());
            hasher.update(tag.as_bytes());
        }
        ETag::from_digest(hasher.finalize().as_bytes())
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// ETag of a document's content.
pub fn compute_object_etag(content: &[u8]) -> ETag {
    ETagHasher::OBJECT.etag(content)
}

/// ETag of a folder given its direct children's names and ETags.
pub fn compute_directory_etag<'a, I>(entries: I) -> ETag
where
    I: IntoIterator<Item = (&'a str, &'a ETag)>,
{
    ETagHasher::FOLDER.folder_etag(entries)
}
