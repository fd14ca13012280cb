use std::collections::HashSet;

use stable_value::{list, map, Sequence};

#[derive(Debug)]
struct Database {
   shard: usize,
}

fn main() {
   // stable list
   let shards = list(10, |shard| {
      println!("opening shard {shard}");
      Database { shard }
   });
   println!("first: {:?}", shards.first());
   println!("shard 3: {:?}", shards.get(3));
   println!("computed so far: {}", (0..shards.len()).filter(|&i| shards.get_if_done(i).is_some()).count());

   let tail = shards.sub_list(7, 10).unwrap();
   let ids: Vec<usize> = tail.reversed().iter().map(|db| db.shard).collect();
   println!("tail, reversed: {ids:?}");

   // stable map
   let lengths = map(["foo", "foobar"], |key: &&str| key.len());
   println!("foo -> {:?}", lengths.get("foo"));
   println!("bar -> {:?}", lengths.get("bar"));
   let values: HashSet<usize> = lengths.values().copied().collect();
   println!("values: {values:?}");
   println!("{lengths:?}");
}
