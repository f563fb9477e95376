pub mod keyed_queue;
