mod io;

use std::path::Path;
use std::sync::mpsc;
use std::thread;

use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rs_markov_core::{ConfigError, Model, ModelConfig, RegexTokenizer, Tokenizer};

/// Splits the corpus into sentences, trains one partial model per chunk in
/// parallel and merges the partial models in corpus order.
///
/// Windows do not cross chunk boundaries, so the result matches loading
/// each chunk with its own `load_sentences` call.
fn train_parallel(text: &str, config: &ModelConfig) -> Result<Model, ConfigError> {
    let sentences = RegexTokenizer::default().split_sentences(text);
    let chunks = num_cpus::get() * 4;
    let chunk_size = sentences.len().div_ceil(chunks).max(1);

    let (tx, rx) = mpsc::channel();
    for (index, chunk) in sentences.chunks(chunk_size).enumerate() {
        let tx = tx.clone();
        let chunk: Vec<String> = chunk.to_vec();
        let config = config.clone();

        thread::spawn(move || {
            let partial = Model::new(config).map(|mut model| {
                model.load_sentences(&chunk, 1);
                model
            });
            if tx.send((index, partial)).is_err() {
                warn!("Chunk {index} finished after the receiver was dropped");
            }
        });
    }
    drop(tx);

    let mut partials: Vec<(usize, Result<Model, ConfigError>)> = rx.iter().collect();
    partials.sort_by_key(|(index, _)| *index);

    let mut model = Model::new(config.clone())?;
    for (_, partial) in partials {
        model.merge(&partial?)?;
    }
    info!("Trained on {} sentences in {chunks} chunks", sentences.len());
    Ok(model)
}

/// Loads the cached model next to the corpus (`.bin`) when it was built
/// with the same configuration, otherwise trains and refreshes the cache.
fn load_or_train<P: AsRef<Path>>(corpus: P, config: &ModelConfig) -> Result<Model, Box<dyn std::error::Error>> {
    let cache = io::build_output_path(&corpus, "bin")?;
    if cache.exists() {
        let snapshot = io::read_snapshot(&cache)?;
        if snapshot.config() == config {
            info!("Loading cached model from {}", cache.display());
            return Ok(Model::from_snapshot(snapshot)?);
        }
        info!("Cached model at {} has another configuration, retraining", cache.display());
    }

    let text = std::fs::read_to_string(&corpus)?;
    let model = train_parallel(&text, config)?;
    model.check_invariants()?;
    io::write_snapshot(&model, &cache)?;
    Ok(model)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Verbosity is controlled by RUST_LOG, e.g. RUST_LOG=info
    env_logger::init();

    // Corpus file, one or more sentences per line
    let corpus = std::env::args().nth(1).unwrap_or_else(|| "./data/sample.txt".to_owned());

    // Trigram model; generated sentences hold between 5 and 25 tokens
    let config = ModelConfig {
        n_factor: 3,
        allow_duplicates: false,
        min_sentence_length: 5,
        max_sentence_length: 25,
        ..Default::default()
    };
    let model = load_or_train(&corpus, &config)?;
    println!(
        "Model: {} words, {} nodes, {} sentence starts",
        model.word_count(),
        model.node_count(),
        model.sentence_starts().len()
    );

    // Sentences follow each other across sentence boundaries
    let mut generator = model.generator();
    for (i, sentence) in generator.generate_sentences(5)?.into_iter().enumerate() {
        match sentence {
            Some(sentence) => println!("Sentence {}: {}", i + 1, sentence),
            None => println!("Sentence {}: (gave up)", i + 1),
        }
    }

    // A seeded generator gives the same output on every run
    let mut seeded = model.generator_with_rng(StdRng::seed_from_u64(42));
    println!("12 tokens: {}", seeded.generate_tokens(12)?);
    println!("Until a full stop: {}", seeded.generate_tokens_until(r"[.?!]", 4, 20)?);

    // Queries
    println!("p(the) = {}", model.get_probability("the"));
    println!("p(of the) = {}", model.get_sequence_probability(&["of", "the"]));
    println!("After 'the': {:?}", model.get_completions(&["the"]));
    println!("Between 'the' and 'of': {:?}", model.get_completions_between(&["the"], &["of"])?);

    // Asking for too wide a context is a configuration error
    match model.get_completions_between(&["in", "the"], &["of"]) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Expected error: {e}"),
    }

    if let Some(probabilities) = model.get_probabilities(&["the"]) {
        let mut top: Vec<(String, f32)> = probabilities.into_iter().collect();
        top.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (token, p) in top.iter().take(5) {
            println!("  the -> {token}: {p:.3}");
        }
    }

    // Set MARKOV_DUMP_TREE to print the whole tree
    if std::env::var_os("MARKOV_DUMP_TREE").is_some() {
        println!("{}", model.as_tree(true));
    }

    Ok(())
}
