pub mod stopwords;
