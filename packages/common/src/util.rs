/// Remove the first occurrence of `item` from `list`, returning whether
/// anything was removed.
pub fn remove_item<T: PartialEq>(list: &mut Vec<T>, item: &T) -> bool {
    if let Some(index) = list.iter().position(|entry| entry == item) {
        list.remove(index);
        true
    } else {
        false
    }
}
